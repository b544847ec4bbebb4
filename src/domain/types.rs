//! Shared domain types.
//!
//! The input side is a typed cleaned table: the columns every stage relies on
//! (`Brand`, `Year`, `Price`, `Sales Volume`) are real fields, anything else a
//! cleaning step left behind lives in side maps and is reachable by name.
//!
//! The output side is one immutable report per stage. Reports are keyed by
//! `BTreeMap` so two runs over the same input serialize identically.

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

pub const BRAND: &str = "Brand";
pub const YEAR: &str = "Year";
pub const PRICE: &str = "Price";
pub const SALES_VOLUME: &str = "Sales Volume";

/// Group key used by the forecaster when no grouping column is requested.
pub const AGGREGATE_KEY: &str = "__aggregate__";

/// Map a user-supplied column name onto its canonical spelling.
///
/// The four core columns are matched case-insensitively and accept `_` in
/// place of a space (`sales_volume`); other names are only trimmed.
pub fn canonical_column(name: &str) -> String {
    let trimmed = name.trim().trim_start_matches('\u{feff}');
    let folded = trimmed.to_ascii_lowercase().replace('_', " ");
    match folded.as_str() {
        "brand" => BRAND.to_string(),
        "year" => YEAR.to_string(),
        "price" => PRICE.to_string(),
        "sales volume" => SALES_VOLUME.to_string(),
        _ => trimmed.to_string(),
    }
}

/// One cleaned observation.
#[derive(Debug, Clone, PartialEq)]
pub struct SalesRecord {
    pub brand: String,
    pub year: i32,
    pub price: f64,
    pub sales_volume: Option<f64>,
    /// Extra categorical attributes (e.g. `Category`, `Segment`).
    pub categories: BTreeMap<String, String>,
    /// Extra numeric attributes (e.g. `Units Returned`).
    pub numerics: BTreeMap<String, f64>,
}

impl SalesRecord {
    pub fn new(brand: impl Into<String>, year: i32, price: f64) -> Self {
        Self {
            brand: brand.into(),
            year,
            price,
            sales_volume: None,
            categories: BTreeMap::new(),
            numerics: BTreeMap::new(),
        }
    }

    pub fn with_volume(mut self, volume: f64) -> Self {
        self.sales_volume = Some(volume);
        self
    }

    pub fn with_category(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.categories.insert(column.into(), value.into());
        self
    }

    pub fn with_numeric(mut self, column: impl Into<String>, value: f64) -> Self {
        self.numerics.insert(column.into(), value);
        self
    }

    /// Categorical value of `column`, usable as a group key.
    pub fn category(&self, column: &str) -> Option<Cow<'_, str>> {
        match column {
            BRAND => Some(Cow::Borrowed(self.brand.as_str())),
            YEAR => Some(Cow::Owned(self.year.to_string())),
            _ => self
                .categories
                .get(column)
                .map(|v| Cow::Borrowed(v.as_str())),
        }
    }

    /// Numeric value of `column`, if this record carries one.
    pub fn numeric(&self, column: &str) -> Option<f64> {
        match column {
            PRICE => Some(self.price),
            SALES_VOLUME => self.sales_volume,
            YEAR => Some(f64::from(self.year)),
            _ => self.numerics.get(column).copied(),
        }
    }
}

/// An ordered collection of cleaned records plus the set of columns the
/// upstream artifact declared.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleanedTable {
    columns: BTreeSet<String>,
    records: Vec<SalesRecord>,
}

impl CleanedTable {
    /// Build a table with an explicit column set (as read from a header).
    ///
    /// `Brand`, `Year` and `Price` are always present because every
    /// `SalesRecord` carries them.
    pub fn new<I, S>(columns: I, records: Vec<SalesRecord>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set: BTreeSet<String> = columns
            .into_iter()
            .map(|c| canonical_column(c.as_ref()))
            .collect();
        for core in [BRAND, YEAR, PRICE] {
            set.insert(core.to_string());
        }
        Self {
            columns: set,
            records,
        }
    }

    /// Build a table whose columns are inferred from the records themselves.
    pub fn from_records(records: Vec<SalesRecord>) -> Self {
        let mut columns: BTreeSet<String> = BTreeSet::new();
        for r in &records {
            if r.sales_volume.is_some() {
                columns.insert(SALES_VOLUME.to_string());
            }
            columns.extend(r.categories.keys().cloned());
            columns.extend(r.numerics.keys().cloned());
        }
        Self::new(columns, records)
    }

    pub fn columns(&self) -> &BTreeSet<String> {
        &self.columns
    }

    pub fn records(&self) -> &[SalesRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.contains(column)
    }

    /// Fail with `MissingColumn` on the first column in `required` that the
    /// table does not declare.
    pub fn require(&self, stage: &'static str, required: &[&str]) -> Result<(), PipelineError> {
        match required.iter().find(|c| !self.has_column(c)) {
            Some(missing) => Err(PipelineError::missing_column(stage, *missing)),
            None => Ok(()),
        }
    }
}

/// Outcome of fitting one group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EstimateStatus {
    Ok,
    InsufficientData,
    DegenerateInput,
}

/// Elasticity fit for one group.
///
/// `coefficient` and `intercept` are `Some` only when `status == Ok`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElasticityEstimate {
    pub coefficient: Option<f64>,
    pub intercept: Option<f64>,
    pub r_squared: f64,
    /// Rows that passed the log-domain filter.
    pub n_observations: usize,
    /// Rows removed by the log-domain filter.
    pub dropped_rows: usize,
    pub status: EstimateStatus,
}

impl ElasticityEstimate {
    pub fn flagged(status: EstimateStatus, n_observations: usize, dropped_rows: usize) -> Self {
        Self {
            coefficient: None,
            intercept: None,
            r_squared: 0.0,
            n_observations,
            dropped_rows,
            status,
        }
    }

    /// The coefficient, if the fit is usable downstream.
    pub fn usable_coefficient(&self) -> Option<f64> {
        match self.status {
            EstimateStatus::Ok => self.coefficient,
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElasticityReport {
    pub group_col: String,
    pub entries: BTreeMap<String, ElasticityEstimate>,
    /// Records skipped because they had no value for `group_col`.
    pub ungrouped_rows: usize,
}

impl ElasticityReport {
    pub fn get(&self, group: &str) -> Option<&ElasticityEstimate> {
        self.entries.get(group)
    }

    pub fn count_by_status(&self, status: EstimateStatus) -> usize {
        self.entries.values().filter(|e| e.status == status).count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastPoint {
    pub period: i32,
    pub value: f64,
    pub is_projected: bool,
}

/// How much to trust a projected series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ForecastConfidence {
    /// A linear trend was fit over at least two periods.
    Trend,
    /// Fewer than two periods; the last value is carried forward.
    Degenerate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastSeries {
    pub points: Vec<ForecastPoint>,
    pub confidence: ForecastConfidence,
    /// Trend per period, when a trend was fit.
    pub slope: Option<f64>,
    pub r_squared: Option<f64>,
}

impl ForecastSeries {
    pub fn historical(&self) -> impl Iterator<Item = &ForecastPoint> {
        self.points.iter().filter(|p| !p.is_projected)
    }

    pub fn projected(&self) -> impl Iterator<Item = &ForecastPoint> {
        self.points.iter().filter(|p| p.is_projected)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastResult {
    pub value_col: String,
    pub group_col: Option<String>,
    pub series: BTreeMap<String, ForecastSeries>,
}

impl ForecastResult {
    pub fn get(&self, group: &str) -> Option<&ForecastSeries> {
        self.series.get(group)
    }
}

/// Competitor price statistics for one `(Brand, Year)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CompetitorStats {
    pub min: f64,
    pub median: f64,
    pub max: f64,
    pub n: usize,
}

/// Competitor benchmarks keyed by brand, then year.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BenchmarkTable {
    pub entries: BTreeMap<String, BTreeMap<i32, CompetitorStats>>,
}

impl BenchmarkTable {
    pub fn insert(&mut self, brand: impl Into<String>, year: i32, stats: CompetitorStats) {
        self.entries.entry(brand.into()).or_default().insert(year, stats);
    }

    /// Benchmark for `brand` in `year`, falling back to the most recent
    /// earlier year on record.
    pub fn lookup(&self, brand: &str, year: i32) -> Option<(i32, &CompetitorStats)> {
        self.entries
            .get(brand)?
            .range(..=year)
            .next_back()
            .map(|(y, s)| (*y, s))
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A signal that contributed to a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RationaleTag {
    Elasticity,
    Benchmark,
    NoSignal,
    /// An elasticity entry existed but was flagged and ignored.
    InsufficientDataSkipped,
    /// The elasticity used was positive (demand rising with price).
    UnexpectedSign,
}

impl RationaleTag {
    pub fn label(self) -> &'static str {
        match self {
            RationaleTag::Elasticity => "ELASTICITY",
            RationaleTag::Benchmark => "BENCHMARK",
            RationaleTag::NoSignal => "NO_SIGNAL",
            RationaleTag::InsufficientDataSkipped => "INSUFFICIENT_DATA_SKIPPED",
            RationaleTag::UnexpectedSign => "UNEXPECTED_SIGN",
        }
    }
}

/// Which rung of the fallback ladder produced a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecommendationBranch {
    Blended,
    BenchmarkOnly,
    ElasticityOnly,
    NoSignal,
}

impl RecommendationBranch {
    pub fn label(self) -> &'static str {
        match self {
            RecommendationBranch::Blended => "BLENDED",
            RecommendationBranch::BenchmarkOnly => "BENCHMARK_ONLY",
            RecommendationBranch::ElasticityOnly => "ELASTICITY_ONLY",
            RecommendationBranch::NoSignal => "NO_SIGNAL",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceRecommendation {
    pub current_price: f64,
    /// Year whose rows defined `current_price`.
    pub reference_year: i32,
    pub recommended_price: f64,
    pub elasticity_used: Option<f64>,
    pub benchmark_median: Option<f64>,
    pub branch: RecommendationBranch,
    pub rationale: BTreeSet<RationaleTag>,
}

impl PriceRecommendation {
    /// Relative change from `current_price` (e.g. `0.05` for +5%).
    pub fn change(&self) -> f64 {
        if self.current_price == 0.0 {
            return 0.0;
        }
        self.recommended_price / self.current_price - 1.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceRecommendations {
    pub group_col: String,
    pub max_step: f64,
    pub entries: BTreeMap<String, PriceRecommendation>,
}

impl PriceRecommendations {
    pub fn get(&self, group: &str) -> Option<&PriceRecommendation> {
        self.entries.get(group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_column_folds_core_names() {
        assert_eq!(canonical_column(" sales_volume "), SALES_VOLUME);
        assert_eq!(canonical_column("\u{feff}BRAND"), BRAND);
        assert_eq!(canonical_column("Segment"), "Segment");
    }

    #[test]
    fn require_reports_first_missing_column() {
        let table = CleanedTable::from_records(vec![SalesRecord::new("A", 2020, 10.0)]);
        let err = table.require("elasticity", &[PRICE, SALES_VOLUME]).unwrap_err();
        assert_eq!(err, PipelineError::missing_column("elasticity", SALES_VOLUME));
        assert!(table.require("pricing", &[BRAND, YEAR, PRICE]).is_ok());
    }

    #[test]
    fn record_lookups_cover_core_and_side_columns() {
        let r = SalesRecord::new("A", 2021, 12.5)
            .with_volume(40.0)
            .with_category("Segment", "Fragrance")
            .with_numeric("Returns", 2.0);
        assert_eq!(r.category(BRAND).as_deref(), Some("A"));
        assert_eq!(r.category(YEAR).as_deref(), Some("2021"));
        assert_eq!(r.category("Segment").as_deref(), Some("Fragrance"));
        assert_eq!(r.numeric(SALES_VOLUME), Some(40.0));
        assert_eq!(r.numeric("Returns"), Some(2.0));
        assert_eq!(r.numeric("Missing"), None);
    }

    #[test]
    fn benchmark_lookup_falls_back_to_earlier_year() {
        let stats = |m: f64| CompetitorStats { min: m, median: m, max: m, n: 1 };
        let mut table = BenchmarkTable::default();
        table.insert("A", 2019, stats(90.0));
        table.insert("A", 2021, stats(110.0));

        assert_eq!(table.lookup("A", 2021).map(|(y, _)| y), Some(2021));
        assert_eq!(table.lookup("A", 2020).map(|(y, _)| y), Some(2019));
        assert!(table.lookup("A", 2018).is_none());
        assert!(table.lookup("B", 2021).is_none());
        assert_eq!(table.len(), 2);
    }
}
