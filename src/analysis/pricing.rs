//! Price recommendation.
//!
//! For every group with a current price we combine up to two signals:
//!
//! - elasticity: step toward higher revenue. Revenue rises with price iff
//!   `1 + e > 0`; the step is `max_step * min(|1 + e|, 1)`.
//! - benchmark: move a fraction `benchmark_weight` of the way to the
//!   competitor median.
//!
//! Fallback ladder, evaluated per group:
//!
//! 1. both signals -> average of the two adjusted prices
//! 2. benchmark only (elasticity missing or flagged)
//! 3. elasticity only (no benchmark)
//! 4. neither -> current price unchanged
//!
//! Whatever fires, the result is clamped to
//! `[current * (1 - max_step), current * (1 + max_step)]`.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info, warn};

use crate::analysis::groups::partition;
use crate::domain::{
    BRAND, BenchmarkTable, CleanedTable, ElasticityReport, PRICE, PipelineConfig, PriceRecommendation,
    PriceRecommendations, RationaleTag, RecommendationBranch, SalesRecord, YEAR,
};
use crate::error::PipelineError;

const STAGE: &str = "pricing";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricingOptions {
    pub max_step: f64,
    pub benchmark_weight: f64,
}

impl Default for PricingOptions {
    fn default() -> Self {
        Self {
            max_step: 0.10,
            benchmark_weight: 0.5,
        }
    }
}

impl From<&PipelineConfig> for PricingOptions {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            max_step: config.max_step,
            benchmark_weight: config.benchmark_weight,
        }
    }
}

impl PricingOptions {
    fn validate(&self) -> Result<(), PipelineError> {
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
        Ok(())
    }
}

/// Reference price for a group: mean positive price in its latest year.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurrentPrice {
    pub year: i32,
    pub price: f64,
}

pub fn current_price(rows: &[&SalesRecord]) -> Option<CurrentPrice> {
    let valid = || rows.iter().filter(|r| r.price.is_finite() && r.price > 0.0);
    let year = valid().map(|r| r.year).max()?;
    let prices: Vec<f64> = valid().filter(|r| r.year == year).map(|r| r.price).collect();
    Some(CurrentPrice {
        year,
        price: prices.iter().sum::<f64>() / prices.len() as f64,
    })
}

/// Recommend a bounded price per group of `elasticity.group_col`.
///
/// Groups come from the table; a group missing from `elasticity` is treated
/// as having no elasticity signal.
pub fn recommend(
    table: &CleanedTable,
    elasticity: &ElasticityReport,
    benchmarks: Option<&BenchmarkTable>,
    opts: &PricingOptions,
) -> Result<PriceRecommendations, PipelineError> {
    opts.validate()?;

    let group_col = elasticity.group_col.as_str();
    table.require(STAGE, &[YEAR, PRICE, group_col])?;

    // Benchmarks are keyed by brand; other groupings cannot be joined to them.
    let benchmarks = match benchmarks {
        Some(_) if group_col != BRAND => {
            warn!(group_col, "benchmarks are keyed by {BRAND}; ignoring them for this grouping");
            None
        }
        other => other,
    };

    let parts = partition(table, Some(group_col));
    let mut entries = BTreeMap::new();

    for (key, rows) in &parts.groups {
        let Some(current) = current_price(rows) else {
            warn!(group = %key, "no positive price on record, skipping");
            continue;
        };
        let rec = recommend_group(key, current, elasticity, benchmarks, opts);
        debug!(
            group = %key,
            current = current.price,
            recommended = rec.recommended_price,
            branch = ?rec.branch,
            "price recommended"
        );
        entries.insert(key.clone(), rec);
    }

    info!(groups = entries.len(), max_step = opts.max_step, "recommendations ready");

    Ok(PriceRecommendations {
        group_col: group_col.to_string(),
        max_step: opts.max_step,
        entries,
    })
}

fn recommend_group(
    key: &str,
    current: CurrentPrice,
    elasticity: &ElasticityReport,
    benchmarks: Option<&BenchmarkTable>,
    opts: &PricingOptions,
) -> PriceRecommendation {
    let entry = elasticity.get(key);
    let coefficient = entry.and_then(|e| e.usable_coefficient());
    let flagged = entry.is_some() && coefficient.is_none();

    let benchmark_median = benchmarks
        .and_then(|b| b.lookup(key, current.year))
        .map(|(_, stats)| stats.median)
        .filter(|m| m.is_finite() && *m > 0.0);

    let p = current.price;
    let by_elasticity = coefficient.map(|e| elasticity_move(p, e, opts.max_step));
    let by_benchmark = benchmark_median.map(|m| p + opts.benchmark_weight * (m - p));

    let (raw, branch) = match (by_elasticity, by_benchmark) {
        (Some(pe), Some(pb)) => ((pe + pb) / 2.0, RecommendationBranch::Blended),
        (None, Some(pb)) => (pb, RecommendationBranch::BenchmarkOnly),
        (Some(pe), None) => (pe, RecommendationBranch::ElasticityOnly),
        (None, None) => (p, RecommendationBranch::NoSignal),
    };

    let mut rationale = BTreeSet::new();
    if by_elasticity.is_some() {
        rationale.insert(RationaleTag::Elasticity);
        if coefficient.is_some_and(|e| e > 0.0) {
            rationale.insert(RationaleTag::UnexpectedSign);
        }
    }
    if by_benchmark.is_some() {
        rationale.insert(RationaleTag::Benchmark);
    }
    if rationale.is_empty() {
        rationale.insert(RationaleTag::NoSignal);
    }
    if flagged {
        rationale.insert(RationaleTag::InsufficientDataSkipped);
    }

    PriceRecommendation {
        current_price: p,
        reference_year: current.year,
        recommended_price: clamp_to_band(raw, p, opts.max_step),
        elasticity_used: coefficient,
        benchmark_median,
        branch,
        rationale,
    }
}

/// Step `price` in the revenue-increasing direction for elasticity `e`.
fn elasticity_move(price: f64, e: f64, max_step: f64) -> f64 {
    let lever = 1.0 + e;
    if lever == 0.0 {
        return price;
    }
    let step = max_step * lever.abs().min(1.0);
    price * (1.0 + lever.signum() * step)
}

fn clamp_to_band(value: f64, current: f64, max_step: f64) -> f64 {
    let lo = current * (1.0 - max_step);
    let hi = current * (1.0 + max_step);
    if value.is_nan() {
        return current;
    }
    value.clamp(lo, hi)
}
