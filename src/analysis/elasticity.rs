//! Price elasticity estimation.
//!
//! For every group we regress `ln(Sales Volume)` on `ln(Price)`; the slope is
//! the elasticity of demand. Groups are independent, so they are fit in
//! parallel and collected into an ordered map.
//!
//! Degenerate groups never fail the run:
//! - fewer than `minimum_sample_size` log-valid rows -> `InsufficientData`
//! - no variation in price -> `DegenerateInput`
//!
//! The sign of the coefficient is not enforced here.

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::analysis::groups::partition;
use crate::domain::{
    CleanedTable, ElasticityEstimate, ElasticityReport, EstimateStatus, PipelineConfig, PRICE,
    SALES_VOLUME, SalesRecord, canonical_column,
};
use crate::error::PipelineError;
use crate::math::fit_line;

const STAGE: &str = "elasticity";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElasticityOptions {
    pub minimum_sample_size: usize,
}

impl Default for ElasticityOptions {
    fn default() -> Self {
        Self {
            minimum_sample_size: 3,
        }
    }
}

impl From<&PipelineConfig> for ElasticityOptions {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            minimum_sample_size: config.minimum_sample_size,
        }
    }
}

/// Estimate per-group price elasticity.
///
/// Fails only if `Price`, `Sales Volume` or `group_col` is missing from the
/// table, or the options are out of range.
pub fn estimate(
    table: &CleanedTable,
    group_col: &str,
    opts: &ElasticityOptions,
) -> Result<ElasticityReport, PipelineError> {
    if opts.minimum_sample_size < 2 {
        return Err(PipelineError::configuration(
            "minimum_sample_size must be >= 2",
        ));
    }

    let group_col = canonical_column(group_col);
    table.require(STAGE, &[PRICE, SALES_VOLUME, group_col.as_str()])?;

    let parts = partition(table, Some(group_col.as_str()));

    let entries = parts
        .groups
        .par_iter()
        .map(|(key, rows)| {
            let estimate = estimate_group(rows, opts.minimum_sample_size);
            debug!(
                group = %key,
                n = estimate.n_observations,
                dropped = estimate.dropped_rows,
                status = ?estimate.status,
                coefficient = ?estimate.coefficient,
                "elasticity fit"
            );
            (key.clone(), estimate)
        })
        .collect();

    let report = ElasticityReport {
        group_col,
        entries,
        ungrouped_rows: parts.ungrouped,
    };

    let flagged = report.entries.len() - report.count_by_status(EstimateStatus::Ok);
    if flagged > 0 {
        warn!(flagged, "some groups have no usable elasticity");
    }
    info!(
        groups = report.entries.len(),
        ok = report.count_by_status(EstimateStatus::Ok),
        "elasticity estimated"
    );

    Ok(report)
}

fn estimate_group(rows: &[&SalesRecord], minimum_sample_size: usize) -> ElasticityEstimate {
    let (log_price, log_volume): (Vec<f64>, Vec<f64>) = rows
        .iter()
        .filter_map(|r| {
            let volume = r.sales_volume?;
            (in_log_domain(r.price) && in_log_domain(volume)).then(|| (r.price.ln(), volume.ln()))
        })
        .unzip();

    let n = log_price.len();
    let dropped = rows.len() - n;

    if n < minimum_sample_size {
        return ElasticityEstimate::flagged(EstimateStatus::InsufficientData, n, dropped);
    }

    match fit_line(&log_price, &log_volume) {
        Some(fit) => ElasticityEstimate {
            coefficient: Some(fit.slope),
            intercept: Some(fit.intercept),
            r_squared: fit.r_squared,
            n_observations: n,
            dropped_rows: dropped,
            status: EstimateStatus::Ok,
        },
        None => ElasticityEstimate::flagged(EstimateStatus::DegenerateInput, n, dropped),
    }
}

fn in_log_domain(v: f64) -> bool {
    v.is_finite() && v > 0.0
}
