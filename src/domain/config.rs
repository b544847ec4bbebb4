//! Run configuration.
//!
//! Values come from (lowest to highest precedence) built-in defaults, an
//! optional YAML file, and CLI flags. `validate` is called once before any
//! stage runs.

use std::fs;
use std::path::Path;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{BRAND, SALES_VOLUME};
use crate::error::{AppError, PipelineError};

/// How per-row values are rolled up into one value per period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    Sum,
    Mean,
    Median,
}

impl Aggregation {
    /// Roll up `values`. Returns `None` for an empty slice.
    pub fn apply(self, values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f64;
        match self {
            Aggregation::Sum => Some(values.iter().sum()),
            Aggregation::Mean => Some(values.iter().sum::<f64>() / n),
            Aggregation::Median => median(values),
        }
    }
}

/// Median of a slice (average of the two middle values for even lengths).
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Which pipeline stage(s) to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    All,
    Elasticity,
    Forecast,
    Benchmark,
    Price,
}

impl Stage {
    pub fn includes(self, other: Stage) -> bool {
        self == Stage::All || self == other
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Minimum valid rows per group for an elasticity fit.
    pub minimum_sample_size: usize,
    /// Forecast horizon in periods (years).
    pub periods: usize,
    /// Maximum relative price move in either direction.
    pub max_step: f64,
    /// Pull toward the competitor median (0 = ignore, 1 = jump to it).
    pub benchmark_weight: f64,
    /// Forecast roll-up per period.
    pub aggregation: Aggregation,
    /// Grouping column for elasticity and pricing.
    pub group_col: String,
    /// Metric projected by the forecaster.
    pub value_col: String,
    /// Optional grouping column for the forecaster (aggregate when absent).
    pub forecast_group_col: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            minimum_sample_size: 3,
            periods: 2,
            max_step: 0.10,
            benchmark_weight: 0.5,
            aggregation: Aggregation::Sum,
            group_col: BRAND.to_string(),
            value_col: SALES_VOLUME.to_string(),
            forecast_group_col: None,
        }
    }
}

impl PipelineConfig {
    pub fn load_from_path(path: &Path) -> Result<Self, AppError> {
        let text = fs::read_to_string(path).map_err(|e| {
            AppError::new(2, format!("Failed to read config '{}': {e}", path.display()))
        })?;
        let config: Self = serde_yaml::from_str(&text).map_err(|e| {
            AppError::new(2, format!("Failed to parse config '{}': {e}", path.display()))
        })?;
        debug!(path = %path.display(), "loaded pipeline config");
        Ok(config)
    }

    /// Reject out-of-range settings before any computation starts.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.periods < 1 {
            return Err(PipelineError::configuration("periods must be >= 1"));
        }
        if self.minimum_sample_size < 2 {
            return Err(PipelineError::configuration(format!(
                "minimum_sample_size must be >= 2 (got {})",
                self.minimum_sample_size
            )));
        }
        if !(self.max_step.is_finite() && (0.0..1.0).contains(&self.max_step)) {
            return Err(PipelineError::configuration(format!(
                "max_step must be in [0, 1) (got {})",
                self.max_step
            )));
        }
        if !(self.benchmark_weight.is_finite() && (0.0..=1.0).contains(&self.benchmark_weight)) {
            return Err(PipelineError::configuration(format!(
                "benchmark_weight must be in [0, 1] (got {})",
                self.benchmark_weight
            )));
        }
        if self.group_col.trim().is_empty() || self.value_col.trim().is_empty() {
            return Err(PipelineError::configuration("column names must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.minimum_sample_size, 3);
        assert_eq!(config.periods, 2);
        assert_eq!(config.aggregation, Aggregation::Sum);
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let bad = [
            PipelineConfig { periods: 0, ..Default::default() },
            PipelineConfig { max_step: -0.1, ..Default::default() },
            PipelineConfig { max_step: f64::NAN, ..Default::default() },
            PipelineConfig { benchmark_weight: 1.5, ..Default::default() },
            PipelineConfig { minimum_sample_size: 1, ..Default::default() },
        ];
        for config in bad {
            assert!(matches!(
                config.validate(),
                Err(PipelineError::Configuration(_))
            ));
        }
    }

    #[test]
    fn yaml_fills_missing_fields_with_defaults() {
        let config: PipelineConfig =
            serde_yaml::from_str("periods: 4\naggregation: median\n").unwrap();
        assert_eq!(config.periods, 4);
        assert_eq!(config.aggregation, Aggregation::Median);
        assert_eq!(config.max_step, 0.10);
    }

    #[test]
    fn load_from_path_rejects_unknown_keys() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.yaml");
        fs::write(&good, "max_step: 0.05\ngroup_col: Segment\n").unwrap();
        let config = PipelineConfig::load_from_path(&good).unwrap();
        assert_eq!(config.max_step, 0.05);
        assert_eq!(config.group_col, "Segment");

        let bad = dir.path().join("bad.yaml");
        fs::write(&bad, "max_stp: 0.05\n").unwrap();
        assert_eq!(PipelineConfig::load_from_path(&bad).unwrap_err().exit_code(), 2);
    }

    #[test]
    fn aggregation_rollups() {
        let v = [3.0, 1.0, 2.0, 10.0];
        assert_eq!(Aggregation::Sum.apply(&v), Some(16.0));
        assert_eq!(Aggregation::Mean.apply(&v), Some(4.0));
        assert_eq!(Aggregation::Median.apply(&v), Some(2.5));
        assert_eq!(Aggregation::Sum.apply(&[]), None);
    }
}
