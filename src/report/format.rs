//! Plain-text terminal summaries of stage reports.
//!
//! We keep formatting code in one place so the analysis code stays free of
//! presentation concerns.

use crate::app::pipeline::PipelineOutput;
use crate::domain::{
    AGGREGATE_KEY, BenchmarkTable, ElasticityReport, EstimateStatus, ForecastConfidence, ForecastResult,
    PriceRecommendations,
};

/// Format every report present in `output`, in pipeline order.
pub fn format_output(output: &PipelineOutput) -> String {
    let mut sections = Vec::new();
    if let Some(r) = &output.elasticity {
        sections.push(format_elasticity(r));
    }
    if let Some(r) = &output.forecast {
        sections.push(format_forecast(r));
    }
    if let Some(r) = &output.benchmarks {
        sections.push(format_benchmarks(r));
    }
    if let Some(r) = &output.recommendations {
        sections.push(format_recommendations(r));
    }
    sections.join("\n")
}

pub fn format_elasticity(report: &ElasticityReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("=== Price elasticity by {} ===\n", report.group_col));
    out.push_str(&header(&[("group", 20), ("elasticity", 11), ("r2", 7), ("n", 5), ("status", 18)]));

    for (group, e) in &report.entries {
        let coefficient = e
            .coefficient
            .map(|c| format!("{c:>11.3}"))
            .unwrap_or_else(|| format!("{:>11}", "-"));
        let r2 = match e.status {
            EstimateStatus::Ok => format!("{:>7.3}", e.r_squared),
            _ => format!("{:>7}", "-"),
        };
        out.push_str(
            format!(
                "{:<20} {} {} {:>5} {:<18}",
                truncate(group, 20),
                coefficient,
                r2,
                e.n_observations,
                status_label(e.status)
            )
            .trim_end(),
        );
        out.push('\n');
    }
    if report.ungrouped_rows > 0 {
        out.push_str(&format!("({} rows had no {})\n", report.ungrouped_rows, report.group_col));
    }
    out
}

pub fn format_forecast(result: &ForecastResult) -> String {
    let mut out = String::new();
    out.push_str(&format!("=== Forecast: {} ===\n", result.value_col));

    for (group, series) in &result.series {
        let note = match series.confidence {
            ForecastConfidence::Trend => series
                .slope
                .map(|s| format!("trend {s:+.2}/yr"))
                .unwrap_or_default(),
            ForecastConfidence::Degenerate => "reduced confidence: single period".to_string(),
        };
        let label = if group == AGGREGATE_KEY { "all rows" } else { group.as_str() };
        out.push_str(&format!("{label} ({note})\n"));
        for p in &series.points {
            let marker = if p.is_projected { "*" } else { " " };
            out.push_str(&format!("  {}{marker} {:>14.2}\n", p.period, p.value));
        }
    }
    out.push_str("(* projected)\n");
    out
}

pub fn format_benchmarks(table: &BenchmarkTable) -> String {
    let mut out = String::new();
    out.push_str("=== Competitor benchmarks ===\n");
    out.push_str(&header(&[("brand", 20), ("year", 6), ("min", 10), ("median", 10), ("max", 10), ("n", 4)]));
    for (brand, years) in &table.entries {
        for (year, s) in years {
            out.push_str(&format!(
                "{:<20} {:>6} {:>10.2} {:>10.2} {:>10.2} {:>4}\n",
                truncate(brand, 20),
                year,
                s.min,
                s.median,
                s.max,
                s.n
            ));
        }
    }
    out
}

pub fn format_recommendations(recs: &PriceRecommendations) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "=== Price recommendations by {} (max step ±{:.0}%) ===\n",
        recs.group_col,
        recs.max_step * 100.0
    ));
    out.push_str(&header(&[("group", 20), ("current", 10), ("recommended", 12), ("change", 8), ("rationale", 0)]));

    for (group, rec) in &recs.entries {
        let tags: Vec<&str> = rec.rationale.iter().map(|t| t.label()).collect();
        out.push_str(&format!(
            "{:<20} {:>10.2} {:>12.2} {:>7.1}% {}\n",
            truncate(group, 20),
            rec.current_price,
            rec.recommended_price,
            rec.change() * 100.0,
            tags.join(",")
        ));
    }
    out
}

fn status_label(status: EstimateStatus) -> &'static str {
    match status {
        EstimateStatus::Ok => "OK",
        EstimateStatus::InsufficientData => "INSUFFICIENT_DATA",
        EstimateStatus::DegenerateInput => "DEGENERATE_INPUT",
    }
}

/// Column titles followed by a dashed rule. The first column is left
/// aligned, the rest right aligned; a width of 0 means "no padding".
fn header(cols: &[(&str, usize)]) -> String {
    let titles: Vec<String> = cols
        .iter()
        .enumerate()
        .map(|(i, &(name, width))| {
            if i == 0 {
                format!("{name:<width$}")
            } else {
                format!("{name:>width$}")
            }
        })
        .collect();
    let rules: Vec<String> = cols
        .iter()
        .map(|(name, w)| "-".repeat((*w).max(name.len())))
        .collect();
    format!("{}\n{}\n", titles.join(" ").trim_end(), rules.join(" "))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}
