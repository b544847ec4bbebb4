//! Error types.
//!
//! Two layers:
//!
//! - `PipelineError`: precondition violations raised by the analysis stages
//!   (missing columns, out-of-range configuration). Statistical degeneracy is
//!   never an error; it is recorded as a per-group status instead.
//! - `AppError`: what the binary reports, carrying a process exit code.

use thiserror::Error;

/// Fatal errors raised by a stage invocation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// A column required by the stage is absent from the input table.
    #[error("{stage}: missing required column `{column}`")]
    MissingColumn { stage: &'static str, column: String },

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    Configuration(String),
}

impl PipelineError {
    pub fn missing_column(stage: &'static str, column: impl Into<String>) -> Self {
        Self::MissingColumn {
            stage,
            column: column.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        // Both variants are caller mistakes (bad input schema or flags).
        AppError::new(2, err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_errors_map_to_usage_exit_code() {
        let err: AppError = PipelineError::missing_column("elasticity", "Sales Volume").into();
        assert_eq!(err.exit_code(), 2);
        assert_eq!(
            err.to_string(),
            "elasticity: missing required column `Sales Volume`"
        );
    }
}
