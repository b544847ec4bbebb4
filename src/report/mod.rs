//! Terminal summaries of stage reports.

pub mod format;

pub use format::*;
