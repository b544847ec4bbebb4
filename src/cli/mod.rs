//! Command-line parsing for the brand pricing pipeline.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! modeling code. Flags left unset fall back to the config file, then to the
//! built-in defaults.

use std::path::PathBuf;

use clap::Parser;

use crate::domain::{Aggregation, PipelineConfig, Stage};

#[derive(Debug, Parser)]
#[command(
    name = "bp",
    version,
    about = "Brand pricing analytics: elasticity, demand forecast and price recommendations"
)]
pub struct Cli {
    /// Which pipeline step to run.
    #[arg(long, value_enum, default_value_t = Stage::All)]
    pub pipeline: Stage,

    /// Cleaned sales table (CSV with Brand, Year, Price[, Sales Volume, ...]).
    #[arg(long, value_name = "CSV")]
    pub data: Option<PathBuf>,

    /// Competitor price observations (CSV with Brand, Year, Price).
    #[arg(long, value_name = "CSV")]
    pub competitors: Option<PathBuf>,

    /// Pre-aggregated benchmarks (CSV with Brand, Year, min, median, max).
    #[arg(long, value_name = "CSV", conflicts_with = "competitors")]
    pub benchmarks: Option<PathBuf>,

    /// Reuse an elasticity report exported by an earlier run.
    #[arg(long, value_name = "JSON")]
    pub reuse_elasticity: Option<PathBuf>,

    /// YAML file with pipeline settings.
    #[arg(short, long, value_name = "YAML")]
    pub config: Option<PathBuf>,

    /// Grouping column for elasticity and pricing.
    #[arg(long)]
    pub group_col: Option<String>,

    /// Metric to forecast.
    #[arg(long)]
    pub value_col: Option<String>,

    /// Forecast per value of this column instead of in aggregate.
    #[arg(long)]
    pub forecast_group_col: Option<String>,

    /// Forecast horizon (years).
    #[arg(long)]
    pub periods: Option<usize>,

    /// Minimum valid rows per group for an elasticity fit.
    #[arg(long)]
    pub min_samples: Option<usize>,

    /// Maximum relative price move (0.10 = ±10%).
    #[arg(long)]
    pub max_step: Option<f64>,

    /// Weight of the pull toward the competitor median.
    #[arg(long)]
    pub benchmark_weight: Option<f64>,

    /// Per-period roll-up used by the forecast.
    #[arg(long, value_enum)]
    pub aggregation: Option<Aggregation>,

    /// Use seeded synthetic data (also the fallback when `--data` is absent).
    #[arg(long)]
    pub synthetic: bool,

    /// Seed for `--synthetic`.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Number of brands for `--synthetic`.
    #[arg(long, default_value_t = 5)]
    pub brands: usize,

    /// Write reports (JSON + CSV) into this directory.
    #[arg(long, value_name = "DIR")]
    pub export: Option<PathBuf>,

    /// Enable debug logging (RUST_LOG overrides).
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Apply flag overrides on top of `base`.
    pub fn apply_overrides(&self, base: PipelineConfig) -> PipelineConfig {
        let mut config = base;
        if let Some(v) = &self.group_col {
            config.group_col = v.clone();
        }
        if let Some(v) = &self.value_col {
            config.value_col = v.clone();
        }
        if let Some(v) = &self.forecast_group_col {
            config.forecast_group_col = Some(v.clone());
        }
        if let Some(v) = self.periods {
            config.periods = v;
        }
        if let Some(v) = self.min_samples {
            config.minimum_sample_size = v;
        }
        if let Some(v) = self.max_step {
            config.max_step = v;
        }
        if let Some(v) = self.benchmark_weight {
            config.benchmark_weight = v;
        }
        if let Some(v) = self.aggregation {
            config.aggregation = v;
        }
        config
    }
}
