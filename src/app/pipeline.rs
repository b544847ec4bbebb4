//! Shared stage-running logic used by the CLI and by tests.
//!
//! Stages are pure functions; this module only decides which of them run and
//! wires outputs to inputs:
//!
//! table -> {elasticity, forecast} -> pricing (+ benchmarks)
//!
//! A previously computed elasticity report can be handed in explicitly. The
//! pricing stage uses, in order: the report computed in this run, the reused
//! report, or a fresh estimate.

use tracing::{info, warn};

use crate::analysis::{
    ElasticityOptions, ForecastOptions, PricingOptions, aggregate_benchmarks, estimate_elasticity,
    forecast, recommend_prices,
};
use crate::domain::{
    BenchmarkTable, CleanedTable, ElasticityReport, ForecastResult, PipelineConfig,
    PriceRecommendations, Stage,
};
use crate::error::PipelineError;

/// Tables handed to the pipeline. Nothing here is mutated.
#[derive(Debug, Clone, Copy)]
pub struct PipelineInputs<'a> {
    pub table: &'a CleanedTable,
    /// Raw competitor observations, aggregated into benchmarks on demand.
    pub competitors: Option<&'a CleanedTable>,
    /// Pre-aggregated benchmarks; preferred over `competitors` when both exist.
    pub benchmarks: Option<&'a BenchmarkTable>,
}

/// Everything the selected stages produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineOutput {
    pub elasticity: Option<ElasticityReport>,
    pub forecast: Option<ForecastResult>,
    pub benchmarks: Option<BenchmarkTable>,
    pub recommendations: Option<PriceRecommendations>,
}

/// Run `stage` (or all stages) over `inputs`.
///
/// Configuration is validated before any computation begins.
pub fn run_stages(
    stage: Stage,
    inputs: &PipelineInputs<'_>,
    config: &PipelineConfig,
    reuse_elasticity: Option<&ElasticityReport>,
) -> Result<PipelineOutput, PipelineError> {
    config.validate()?;

    let mut out = PipelineOutput::default();

    if stage.includes(Stage::Elasticity) {
        out.elasticity = Some(estimate_elasticity(
            inputs.table,
            &config.group_col,
            &ElasticityOptions::from(config),
        )?);
    }

    if stage.includes(Stage::Forecast) {
        out.forecast = Some(forecast(
            inputs.table,
            &config.value_col,
            config.forecast_group_col.as_deref(),
            &ForecastOptions::from_config(config),
        )?);
    }

    let benchmarks = if stage.includes(Stage::Benchmark) || stage.includes(Stage::Price) {
        resolve_benchmarks(inputs)?
    } else {
        None
    };
    if stage.includes(Stage::Benchmark) {
        if benchmarks.is_none() {
            warn!("benchmark stage selected but no competitor data was supplied");
        }
        out.benchmarks = benchmarks.clone();
    }

    if stage.includes(Stage::Price) {
        let fresh;
        let elasticity = match (out.elasticity.as_ref(), reuse_elasticity) {
            (Some(report), _) => report,
            (None, Some(report)) => {
                info!("reusing supplied elasticity report");
                report
            }
            (None, None) => {
                fresh = estimate_elasticity(
                    inputs.table,
                    &config.group_col,
                    &ElasticityOptions::from(config),
                )?;
                &fresh
            }
        };
        out.recommendations = Some(recommend_prices(
            inputs.table,
            elasticity,
            benchmarks.as_ref(),
            &PricingOptions::from(config),
        )?);
    }

    Ok(out)
}

fn resolve_benchmarks(inputs: &PipelineInputs<'_>) -> Result<Option<BenchmarkTable>, PipelineError> {
    if let Some(table) = inputs.benchmarks {
        return Ok(Some(table.clone()));
    }
    inputs.competitors.map(aggregate_benchmarks).transpose()
}
