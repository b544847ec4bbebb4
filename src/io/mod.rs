//! Input/output helpers.
//!
//! - CSV ingest for cleaned tables and benchmarks (`ingest`)
//! - report exports (JSON/CSV) (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
