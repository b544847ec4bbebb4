//! `brand-pricing` library crate.
//!
//! The binary (`bp`) is a thin wrapper around this library so that:
//!
//! - every stage is testable without spawning processes
//! - stages can be called directly from other tools
//! - code stays easy to navigate as the project grows

pub mod analysis;
pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod log;
pub mod math;
pub mod report;
