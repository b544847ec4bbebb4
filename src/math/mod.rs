//! Mathematical utilities: least squares and simple regression.

pub mod ols;

pub use ols::*;
