//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the typed cleaned input table (`CleanedTable`, `SalesRecord`)
//! - per-stage reports (`ElasticityReport`, `ForecastResult`, `BenchmarkTable`,
//!   `PriceRecommendations`)
//! - run configuration (`PipelineConfig`, `Aggregation`, `Stage`)

pub mod config;
pub mod types;

pub use config::*;
pub use types::*;
