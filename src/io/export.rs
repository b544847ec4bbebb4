//! Export stage reports.
//!
//! Every report is written as pretty JSON into the export directory, plus a
//! flat `recommendations.csv` that is easy to open in a spreadsheet and a
//! `manifest.json` describing the run.

use std::fs::{File, create_dir_all};
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tracing::info;

use crate::app::pipeline::PipelineOutput;
use crate::domain::{PipelineConfig, PriceRecommendations};
use crate::error::AppError;

#[derive(Debug, Serialize)]
struct Manifest<'a> {
    tool: &'static str,
    generated_at: String,
    config: &'a PipelineConfig,
    files: Vec<String>,
}

/// Write every report present in `output` into `dir`. Returns the paths written.
pub fn write_reports(dir: &Path, output: &PipelineOutput, config: &PipelineConfig) -> Result<Vec<PathBuf>, AppError> {
    create_dir_all(dir)
        .map_err(|e| AppError::new(4, format!("Failed to create export dir '{}': {e}", dir.display())))?;

    let mut written = Vec::new();
    if let Some(report) = &output.elasticity {
        written.push(write_json(&dir.join("elasticity.json"), report)?);
    }
    if let Some(report) = &output.forecast {
        written.push(write_json(&dir.join("forecast.json"), report)?);
    }
    if let Some(report) = &output.benchmarks {
        written.push(write_json(&dir.join("benchmarks.json"), report)?);
    }
    if let Some(report) = &output.recommendations {
        written.push(write_json(&dir.join("recommendations.json"), report)?);
        let csv_path = dir.join("recommendations.csv");
        write_recommendations_csv(&csv_path, report)?;
        written.push(csv_path);
    }

    let manifest = Manifest {
        tool: "bp",
        generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        config,
        files: written
            .iter()
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect(),
    };
    written.push(write_json(&dir.join("manifest.json"), &manifest)?);

    info!(dir = %dir.display(), files = written.len(), "reports exported");
    Ok(written)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<PathBuf, AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(4, format!("Failed to create '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, value)
        .map_err(|e| AppError::new(4, format!("Failed to write '{}': {e}", path.display())))?;
    Ok(path.to_path_buf())
}

/// Write one row per group: prices, the branch taken and `|`-joined tags.
pub fn write_recommendations_csv(path: &Path, recs: &PriceRecommendations) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::new(4, format!("Failed to create '{}': {e}", path.display())))?;

    writer
        .write_record([
            recs.group_col.as_str(),
            "reference_year",
            "current_price",
            "recommended_price",
            "change",
            "elasticity_used",
            "benchmark_median",
            "branch",
            "rationale",
        ])
        .map_err(|e| AppError::new(4, format!("Failed to write CSV header: {e}")))?;

    for (group, rec) in &recs.entries {
        let tags: Vec<&str> = rec.rationale.iter().map(|t| t.label()).collect();
        writer
            .write_record([
                group.clone(),
                rec.reference_year.to_string(),
                format!("{:.4}", rec.current_price),
                format!("{:.4}", rec.recommended_price),
                format!("{:.6}", rec.change()),
                rec.elasticity_used.map(|e| format!("{e:.6}")).unwrap_or_default(),
                rec.benchmark_median.map(|m| format!("{m:.4}")).unwrap_or_default(),
                rec.branch.label().to_string(),
                tags.join("|"),
            ])
            .map_err(|e| AppError::new(4, format!("Failed to write CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::new(4, format!("Failed to flush CSV: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    use crate::domain::{PriceRecommendation, RationaleTag, RecommendationBranch};

    #[test]
    fn recommendations_csv_has_one_row_per_group() {
        let recs = PriceRecommendations {
            group_col: "Brand".to_string(),
            max_step: 0.1,
            entries: [(
                "Gucci".to_string(),
                PriceRecommendation {
                    current_price: 200.0,
                    reference_year: 2023,
                    recommended_price: 210.0,
                    elasticity_used: None,
                    benchmark_median: Some(220.0),
                    branch: RecommendationBranch::BenchmarkOnly,
                    rationale: BTreeSet::from([
                        RationaleTag::Benchmark,
                        RationaleTag::InsufficientDataSkipped,
                    ]),
                },
            )]
            .into_iter()
            .collect(),
        };

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recs.csv");
        write_recommendations_csv(&path, &recs).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        assert_eq!(reader.headers().unwrap().get(0), Some("Brand"));
        let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get(0), Some("Gucci"));
        assert_eq!(rows[0].get(5), Some(""));
        assert_eq!(rows[0].get(7), Some("BENCHMARK_ONLY"));
        assert_eq!(rows[0].get(8), Some("BENCHMARK|INSUFFICIENT_DATA_SKIPPED"));
    }

    #[test]
    fn empty_output_still_writes_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("nested");
        let written = write_reports(&out_dir, &PipelineOutput::default(), &PipelineConfig::default()).unwrap();
        assert_eq!(written, vec![out_dir.join("manifest.json")]);
    }
}
