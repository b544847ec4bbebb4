//! Demo data sources.

pub mod sample;

pub use sample::{SampleConfig, SampleData, generate_sample};
