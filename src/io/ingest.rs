//! CSV ingest for cleaned tables and benchmark tables.
//!
//! Inputs are expected to be already cleaned upstream; this module only maps
//! columns onto typed records.
//!
//! Design goals:
//! - **Strict schema** for the core columns (clear errors + exit code 2)
//! - **Row-level validation** (skip bad rows, but report what happened)
//! - **Deterministic behavior** (input order is preserved)

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use tracing::{debug, warn};

use crate::domain::{
    BRAND, BenchmarkTable, CleanedTable, CompetitorStats, ElasticityReport, PRICE, SALES_VOLUME, SalesRecord, YEAR,
    canonical_column,
};
use crate::error::AppError;

/// A row-level error encountered during ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: the typed table plus what was skipped.
#[derive(Debug, Clone)]
pub struct IngestedTable {
    pub table: CleanedTable,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

/// Load a cleaned sales table from a CSV file.
pub fn load_table(path: &Path) -> Result<IngestedTable, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;
    let ingested = read_table(file)?;
    debug!(
        path = %path.display(),
        rows = ingested.rows_read,
        skipped = ingested.row_errors.len(),
        "table loaded"
    );
    Ok(ingested)
}

/// Read a cleaned sales table from any CSV source.
///
/// Required headers: `Brand`, `Year`, `Price`. `Sales Volume` and any other
/// column are optional; extra columns are kept both as categorical text and,
/// when parseable, as numbers.
pub fn read_table<R: Read>(source: R) -> Result<IngestedTable, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(source);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    for required in [BRAND, YEAR, PRICE] {
        if !header_map.contains_key(required) {
            return Err(AppError::new(2, format!("Missing required column: `{required}`")));
        }
    }

    let extras: Vec<(&String, usize)> = header_map
        .iter()
        .filter(|(name, _)| ![BRAND, YEAR, PRICE, SALES_VOLUME].contains(&name.as_str()))
        .map(|(name, idx)| (name, *idx))
        .collect();

    let mut records = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // +2: header is line 1, records are 1-based after it.
        let line = idx + 2;
        rows_read += 1;

        let parsed = result
            .map_err(|e| format!("CSV parse error: {e}"))
            .and_then(|record| parse_sales_row(&record, &header_map, &extras));
        match parsed {
            Ok(r) => records.push(r),
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    if !row_errors.is_empty() {
        warn!(skipped = row_errors.len(), "rows rejected during ingest");
    }

    let columns: Vec<&str> = header_map.keys().map(String::as_str).collect();
    Ok(IngestedTable {
        table: CleanedTable::new(columns, records),
        row_errors,
        rows_read,
    })
}

/// Load a pre-aggregated benchmark table (`Brand,Year,min,median,max[,n]`).
pub fn load_benchmarks(path: &Path) -> Result<BenchmarkTable, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::new(2, format!("Failed to open benchmark CSV '{}': {e}", path.display()))
    })?;
    read_benchmarks(file)
}

pub fn read_benchmarks<R: Read>(source: R) -> Result<BenchmarkTable, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(source);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read benchmark headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    for required in [BRAND, YEAR, "min", "median", "max"] {
        if !header_map.contains_key(required) {
            return Err(AppError::new(
                2,
                format!("Missing required benchmark column: `{required}`"),
            ));
        }
    }

    let mut table = BenchmarkTable::default();
    for (idx, result) in reader.records().enumerate() {
        let line = idx + 2;
        let record = result
            .map_err(|e| AppError::new(2, format!("Benchmark CSV line {line}: {e}")))?;
        let (brand, year, stats) = parse_benchmark_row(&record, &header_map)
            .map_err(|e| AppError::new(2, format!("Benchmark CSV line {line}: {e}")))?;
        table.insert(brand, year, stats);
    }
    Ok(table)
}

/// Load an elasticity report exported by a previous run, for reuse.
pub fn load_elasticity_report(path: &Path) -> Result<ElasticityReport, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::new(2, format!("Failed to open elasticity report '{}': {e}", path.display()))
    })?;
    serde_json::from_reader(file)
        .map_err(|e| AppError::new(2, format!("Invalid elasticity report JSON: {e}")))
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    let canonical = canonical_column(name);
    match canonical.to_ascii_lowercase().as_str() {
        // Benchmark statistic columns are matched case-insensitively.
        stat @ ("min" | "median" | "max" | "n") => stat.to_string(),
        _ => canonical,
    }
}

fn parse_sales_row(
    record: &StringRecord,
    header_map: &HashMap<String, usize>,
    extras: &[(&String, usize)],
) -> Result<SalesRecord, String> {
    let brand = get_required(record, header_map, BRAND)?.to_string();
    let year = parse_year(get_required(record, header_map, YEAR)?)?;
    let price = parse_f64(get_required(record, header_map, PRICE)?, PRICE)?;

    let mut row = SalesRecord::new(brand, year, price);
    if let Some(raw) = get_optional(record, header_map, SALES_VOLUME) {
        row.sales_volume = Some(parse_f64(raw, SALES_VOLUME)?);
    }

    for (name, idx) in extras {
        let Some(raw) = record.get(*idx).filter(|s| !s.is_empty()) else {
            continue;
        };
        if let Ok(v) = raw.parse::<f64>() {
            if v.is_finite() {
                row.numerics.insert((*name).clone(), v);
            }
        }
        row.categories.insert((*name).clone(), raw.to_string());
    }

    Ok(row)
}

fn parse_benchmark_row(
    record: &StringRecord,
    header_map: &HashMap<String, usize>,
) -> Result<(String, i32, CompetitorStats), String> {
    let brand = get_required(record, header_map, BRAND)?.to_string();
    let year = parse_year(get_required(record, header_map, YEAR)?)?;
    let min = parse_f64(get_required(record, header_map, "min")?, "min")?;
    let median = parse_f64(get_required(record, header_map, "median")?, "median")?;
    let max = parse_f64(get_required(record, header_map, "max")?, "max")?;
    let n = match get_optional(record, header_map, "n") {
        Some(raw) => raw
            .parse::<usize>()
            .map_err(|_| format!("Invalid `n` value '{raw}'."))?,
        None => 0,
    };
    if !(min <= median && median <= max) {
        return Err(format!("Expected min <= median <= max, got {min}/{median}/{max}."));
    }
    Ok((brand, year, CompetitorStats { min, median, max, n }))
}

fn get_required<'a>(
    record: &'a StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> Result<&'a str, String> {
    let idx = header_map
        .get(name)
        .ok_or_else(|| format!("Missing required column: `{name}`"))?;
    record
        .get(*idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("Missing required value: `{name}`"))
}

fn get_optional<'a>(record: &'a StringRecord, header_map: &HashMap<String, usize>, name: &str) -> Option<&'a str> {
    let idx = header_map.get(name)?;
    record.get(*idx).map(str::trim).filter(|s| !s.is_empty())
}

fn parse_year(s: &str) -> Result<i32, String> {
    if let Ok(y) = s.parse::<i32>() {
        return Ok(y);
    }
    // Spreadsheet exports often write years as `2021.0`.
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < f64::from(i32::MAX) => Ok(v as i32),
        _ => Err(format!("Invalid `Year` value '{s}'.")),
    }
}

fn parse_f64(s: &str, column: &str) -> Result<f64, String> {
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(format!("Invalid `{column}` value '{s}'.")),
    }
}
