//! Competitor price benchmarks.
//!
//! Competitor observations are grouped by `(Brand, Year)` and summarized as
//! min / median / max price. The pricing stage anchors toward the median.

use std::collections::BTreeMap;

use tracing::info;

use crate::domain::{BRAND, BenchmarkTable, CleanedTable, CompetitorStats, PRICE, YEAR, median};
use crate::error::PipelineError;

const STAGE: &str = "benchmark";

/// Summarize competitor prices per `(Brand, Year)`.
///
/// Non-positive or non-finite prices are ignored; a key with no valid price
/// gets no entry.
pub fn aggregate(competitors: &CleanedTable) -> Result<BenchmarkTable, PipelineError> {
    competitors.require(STAGE, &[BRAND, YEAR, PRICE])?;

    let mut prices: BTreeMap<(&str, i32), Vec<f64>> = BTreeMap::new();
    for r in competitors.records() {
        if r.price.is_finite() && r.price > 0.0 {
            prices.entry((r.brand.as_str(), r.year)).or_default().push(r.price);
        }
    }

    let mut table = BenchmarkTable::default();
    for ((brand, year), values) in prices {
        if let Some(stats) = summarize(&values) {
            table.insert(brand, year, stats);
        }
    }

    info!(brands = table.entries.len(), entries = table.len(), "benchmarks aggregated");
    Ok(table)
}

fn summarize(values: &[f64]) -> Option<CompetitorStats> {
    let median = median(values)?;
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    Some(CompetitorStats {
        min,
        median,
        max,
        n: values.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SalesRecord;

    #[test]
    fn summarizes_per_brand_and_year() {
        let table = CleanedTable::from_records(vec![
            SalesRecord::new("A", 2021, 90.0),
            SalesRecord::new("A", 2021, 110.0),
            SalesRecord::new("A", 2021, 130.0),
            SalesRecord::new("A", 2021, -5.0),
            SalesRecord::new("A", 2022, 120.0),
            SalesRecord::new("B", 2021, 0.0),
        ]);
        let bench = aggregate(&table).unwrap();

        let (_, a21) = bench.lookup("A", 2021).unwrap();
        assert_eq!(
            *a21,
            CompetitorStats { min: 90.0, median: 110.0, max: 130.0, n: 3 }
        );
        assert_eq!(bench.lookup("A", 2022).unwrap().1.median, 120.0);
        assert!(bench.lookup("B", 2021).is_none());
        assert_eq!(bench.len(), 2);
    }
}
