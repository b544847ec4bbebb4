//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and resolves the pipeline config
//! - loads CSV inputs (or generates synthetic ones)
//! - runs the selected stages
//! - prints reports and writes optional exports

use clap::Parser;
use tracing::{debug, info, warn};

use crate::cli::Cli;
use crate::data::{SampleConfig, generate_sample};
use crate::domain::{BenchmarkTable, CleanedTable, ElasticityReport, PipelineConfig};
use crate::error::AppError;
use crate::io::IngestedTable;

pub mod pipeline;

use pipeline::{PipelineInputs, run_stages};

/// Entry point for the `bp` binary.
pub fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    crate::log::init_logging(cli.verbose);

    let config = resolve_config(&cli)?;
    let (table, competitors) = load_inputs(&cli)?;
    let benchmarks: Option<BenchmarkTable> = cli
        .benchmarks
        .as_deref()
        .map(crate::io::load_benchmarks)
        .transpose()?;
    let reused: Option<ElasticityReport> = cli
        .reuse_elasticity
        .as_deref()
        .map(crate::io::load_elasticity_report)
        .transpose()?;

    let inputs = PipelineInputs {
        table: &table,
        competitors: competitors.as_ref(),
        benchmarks: benchmarks.as_ref(),
    };
    info!(stage = ?cli.pipeline, rows = table.len(), "running pipeline");
    let output = run_stages(cli.pipeline, &inputs, &config, reused.as_ref())?;

    println!("{}", crate::report::format_output(&output));

    if let Some(dir) = &cli.export {
        let written = crate::io::write_reports(dir, &output, &config)?;
        eprintln!("Exported {} files to {}", written.len(), dir.display());
    }

    Ok(())
}

/// Defaults, then the YAML file, then flags. Validated before returning.
pub fn resolve_config(cli: &Cli) -> Result<PipelineConfig, AppError> {
    let base = match &cli.config {
        Some(path) => PipelineConfig::load_from_path(path)?,
        None => PipelineConfig::default(),
    };
    let config = cli.apply_overrides(base);
    config.validate()?;
    debug!(?config, "config resolved");
    Ok(config)
}

fn load_inputs(cli: &Cli) -> Result<(CleanedTable, Option<CleanedTable>), AppError> {
    let data = match (&cli.data, cli.synthetic) {
        (Some(path), false) => path,
        (Some(_), true) => {
            warn!("--synthetic given; ignoring --data");
            return synthetic_inputs(cli);
        }
        (None, _) => return synthetic_inputs(cli),
    };
    let table = load_logged(data)?;
    let competitors = cli.competitors.as_deref().map(load_logged).transpose()?;
    Ok((table, competitors))
}

fn synthetic_inputs(cli: &Cli) -> Result<(CleanedTable, Option<CleanedTable>), AppError> {
    info!(seed = cli.seed, brands = cli.brands, "using synthetic sample");
    let sample = generate_sample(&SampleConfig {
        brands: cli.brands,
        seed: cli.seed,
        ..Default::default()
    })?;
    // Explicit competitor files still win over the synthetic ones.
    let competitors = match (&cli.competitors, &cli.benchmarks) {
        (Some(path), _) => Some(load_logged(path)?),
        (None, Some(_)) => None,
        (None, None) => Some(sample.competitors),
    };
    Ok((sample.table, competitors))
}

fn load_logged(path: &std::path::Path) -> Result<CleanedTable, AppError> {
    let IngestedTable {
        table,
        row_errors,
        rows_read,
    } = crate::io::load_table(path)?;
    for err in row_errors.iter().take(5) {
        warn!(line = err.line, "{}", err.message);
    }
    if row_errors.len() > 5 {
        warn!("... {} more rows skipped", row_errors.len() - 5);
    }
    if table.is_empty() {
        return Err(AppError::new(
            3,
            format!(
                "No usable rows in '{}' ({rows_read} read, {} skipped).",
                path.display(),
                row_errors.len()
            ),
        ));
    }
    Ok(table)
}
