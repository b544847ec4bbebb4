//! Yearly trend forecasting.
//!
//! Each group's metric is rolled up to one value per `Year`, a straight line is
//! fit through those points, and the line is extended one year at a time past
//! the last observed year. Historical points are echoed unchanged so callers
//! can tell observed from projected values.
//!
//! With fewer than two periods there is no trend to fit: the last value is
//! carried forward and the series is marked `Degenerate`.

use std::collections::BTreeMap;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::analysis::groups::partition;
use crate::domain::{
    Aggregation, CleanedTable, ForecastConfidence, ForecastPoint, ForecastResult, ForecastSeries,
    PRICE, PipelineConfig, SALES_VOLUME, SalesRecord, YEAR, canonical_column,
};
use crate::error::PipelineError;
use crate::math::fit_line;

const STAGE: &str = "forecast";

/// Admissible range of the projected metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueDomain {
    /// Volumes and prices: negative projections are clamped to zero.
    NonNegative,
    Unbounded,
}

impl ValueDomain {
    pub fn infer(value_col: &str) -> Self {
        match canonical_column(value_col).as_str() {
            SALES_VOLUME | PRICE => ValueDomain::NonNegative,
            _ => ValueDomain::Unbounded,
        }
    }

    fn clamp(self, v: f64) -> f64 {
        match self {
            ValueDomain::NonNegative => v.max(0.0),
            ValueDomain::Unbounded => v,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForecastOptions {
    pub periods: usize,
    pub aggregation: Aggregation,
    pub domain: ValueDomain,
}

impl ForecastOptions {
    /// Defaults for `value_col`: two periods, summed, domain inferred.
    pub fn for_column(value_col: &str) -> Self {
        Self {
            periods: 2,
            aggregation: Aggregation::Sum,
            domain: ValueDomain::infer(value_col),
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            periods: config.periods,
            aggregation: config.aggregation,
            domain: ValueDomain::infer(&config.value_col),
        }
    }
}

/// Project `value_col` forward `opts.periods` years, per group or in aggregate.
pub fn forecast(
    table: &CleanedTable,
    value_col: &str,
    group_col: Option<&str>,
    opts: &ForecastOptions,
) -> Result<ForecastResult, PipelineError> {
    if opts.periods < 1 {
        return Err(PipelineError::configuration("periods must be >= 1"));
    }

    let value_col = canonical_column(value_col);
    let group_col = group_col.map(canonical_column);

    let mut required = vec![YEAR, value_col.as_str()];
    if let Some(col) = &group_col {
        required.push(col.as_str());
    }
    table.require(STAGE, &required)?;

    let parts = partition(table, group_col.as_deref());
    if parts.ungrouped > 0 {
        warn!(rows = parts.ungrouped, "rows without a group value were skipped");
    }

    let series: BTreeMap<String, ForecastSeries> = parts
        .groups
        .par_iter()
        .filter_map(|(key, rows)| {
            let history = aggregate_by_year(rows, &value_col, opts.aggregation);
            if history.is_empty() {
                warn!(group = %key, column = %value_col, "no values to forecast");
                return None;
            }
            let series = project(&history, opts);
            debug!(
                group = %key,
                periods = history.len(),
                confidence = ?series.confidence,
                slope = ?series.slope,
                "forecast series"
            );
            Some((key.clone(), series))
        })
        .collect();

    info!(
        series = series.len(),
        horizon = opts.periods,
        column = %value_col,
        "forecast complete"
    );

    Ok(ForecastResult {
        value_col,
        group_col,
        series,
    })
}

/// One rolled-up value per year, ascending. Rows without a finite value for
/// `value_col` are ignored.
fn aggregate_by_year(rows: &[&SalesRecord], value_col: &str, aggregation: Aggregation) -> Vec<(i32, f64)> {
    let mut by_year: BTreeMap<i32, Vec<f64>> = BTreeMap::new();
    for r in rows {
        if let Some(v) = r.numeric(value_col).filter(|v| v.is_finite()) {
            by_year.entry(r.year).or_default().push(v);
        }
    }
    by_year
        .into_iter()
        .filter_map(|(year, values)| aggregation.apply(&values).map(|v| (year, v)))
        .collect()
}

fn project(history: &[(i32, f64)], opts: &ForecastOptions) -> ForecastSeries {
    let mut points: Vec<ForecastPoint> = history
        .iter()
        .map(|&(period, value)| ForecastPoint {
            period,
            value,
            is_projected: false,
        })
        .collect();

    let (first_year, _) = history[0];
    let (last_year, last_value) = history[history.len() - 1];

    // Regress on years since the first observation to keep the design well scaled.
    let x: Vec<f64> = history.iter().map(|(y, _)| f64::from(y - first_year)).collect();
    let v: Vec<f64> = history.iter().map(|(_, v)| *v).collect();
    let trend = if history.len() >= 2 { fit_line(&x, &v) } else { None };

    let future = (1..=opts.periods).map(|k| last_year.saturating_add(k as i32));

    match trend {
        Some(fit) => {
            points.extend(future.map(|period| ForecastPoint {
                period,
                value: opts.domain.clamp(fit.predict(f64::from(period - first_year))),
                is_projected: true,
            }));
            ForecastSeries {
                points,
                confidence: ForecastConfidence::Trend,
                slope: Some(fit.slope),
                r_squared: Some(fit.r_squared),
            }
        }
        None => {
            let carried = opts.domain.clamp(last_value);
            points.extend(future.map(|period| ForecastPoint {
                period,
                value: carried,
                is_projected: true,
            }));
            ForecastSeries {
                points,
                confidence: ForecastConfidence::Degenerate,
                slope: None,
                r_squared: None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AGGREGATE_KEY, BRAND};

    fn volume_row(brand: &str, year: i32, volume: f64) -> SalesRecord {
        SalesRecord::new(brand, year, 100.0).with_volume(volume)
    }

    #[test]
    fn echoes_history_and_extrapolates_line() {
        let table = CleanedTable::from_records(vec![
            volume_row("A", 2020, 60.0),
            volume_row("B", 2020, 40.0),
            volume_row("A", 2021, 150.0),
        ]);
        let opts = ForecastOptions {
            periods: 1,
            ..ForecastOptions::for_column(SALES_VOLUME)
        };

        let result = forecast(&table, SALES_VOLUME, None, &opts).unwrap();
        let series = result.get(AGGREGATE_KEY).unwrap();

        assert_eq!(
            series.historical().copied().collect::<Vec<_>>(),
            vec![
                ForecastPoint { period: 2020, value: 100.0, is_projected: false },
                ForecastPoint { period: 2021, value: 150.0, is_projected: false },
            ]
        );
        let projected: Vec<_> = series.projected().collect();
        assert_eq!(projected.len(), 1);
        assert_eq!(projected[0].period, 2022);
        assert!((projected[0].value - 200.0).abs() < 1e-9);
        assert_eq!(series.confidence, ForecastConfidence::Trend);
    }

    #[test]
    fn declining_volume_is_clamped_at_zero() {
        let table = CleanedTable::from_records(vec![
            volume_row("A", 2020, 300.0),
            volume_row("A", 2021, 200.0),
            volume_row("A", 2022, 100.0),
        ]);
        let opts = ForecastOptions {
            periods: 3,
            ..ForecastOptions::for_column(SALES_VOLUME)
        };

        let result = forecast(&table, SALES_VOLUME, Some(BRAND), &opts).unwrap();
        let values: Vec<f64> = result.get("A").unwrap().projected().map(|p| p.value).collect();
        assert_eq!(values.len(), 3);
        assert!(values[0].abs() < 1e-9);
        assert!(values.iter().all(|v| *v >= 0.0));
    }

    #[test]
    fn unbounded_metrics_may_go_negative() {
        let rows = vec![
            SalesRecord::new("A", 2020, 10.0).with_numeric("Margin", 1.0),
            SalesRecord::new("A", 2021, 10.0).with_numeric("Margin", -1.0),
        ];
        let table = CleanedTable::from_records(rows);
        let opts = ForecastOptions::for_column("Margin");
        assert_eq!(opts.domain, ValueDomain::Unbounded);

        let result = forecast(&table, "Margin", None, &opts).unwrap();
        let last = result.get(AGGREGATE_KEY).unwrap().points.last().copied().unwrap();
        assert_eq!(last.period, 2023);
        assert!((last.value + 5.0).abs() < 1e-9);
    }

    #[test]
    fn single_period_repeats_last_value_with_reduced_confidence() {
        let table = CleanedTable::from_records(vec![
            volume_row("A", 2021, 70.0),
            volume_row("A", 2021, 30.0),
        ]);
        let result = forecast(
            &table,
            SALES_VOLUME,
            Some(BRAND),
            &ForecastOptions::for_column(SALES_VOLUME),
        )
        .unwrap();
        let series = result.get("A").unwrap();

        assert_eq!(series.confidence, ForecastConfidence::Degenerate);
        assert!(series.slope.is_none());
        let projected: Vec<(i32, f64)> = series.projected().map(|p| (p.period, p.value)).collect();
        assert_eq!(projected, vec![(2022, 100.0), (2023, 100.0)]);
    }

    #[test]
    fn mean_aggregation_and_year_gaps() {
        let table = CleanedTable::from_records(vec![
            volume_row("A", 2018, 10.0),
            volume_row("A", 2018, 30.0),
            volume_row("A", 2020, 40.0),
        ]);
        let opts = ForecastOptions {
            periods: 1,
            aggregation: Aggregation::Mean,
            domain: ValueDomain::NonNegative,
        };
        let result = forecast(&table, SALES_VOLUME, None, &opts).unwrap();
        let series = result.get(AGGREGATE_KEY).unwrap();

        assert_eq!(series.points[0].value, 20.0);
        // Slope of 10 per year across the 2019 gap.
        let next = series.projected().next().unwrap();
        assert_eq!(next.period, 2021);
        assert!((next.value - 50.0).abs() < 1e-9);
    }

    #[test]
    fn missing_value_column_and_bad_horizon_fail() {
        let table = CleanedTable::from_records(vec![SalesRecord::new("A", 2020, 10.0)]);
        let err = forecast(&table, SALES_VOLUME, None, &ForecastOptions::for_column(SALES_VOLUME))
            .unwrap_err();
        assert_eq!(err, PipelineError::missing_column("forecast", SALES_VOLUME));

        let opts = ForecastOptions {
            periods: 0,
            ..ForecastOptions::for_column(PRICE)
        };
        assert!(matches!(
            forecast(&table, PRICE, None, &opts),
            Err(PipelineError::Configuration(_))
        ));
    }
}
