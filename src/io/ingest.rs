//! CSV ingest.
//!
//! Turns a surveillance export into an `ObservationTable` of raw
//! `(date, region, value)` rows. Two source layouts are understood:
//!
//! - `cumulative`: ISO dates, a region column and a running-total column
//! - `localized-daily`: `YYYY年MM月DD日` dates and a daily new-cases column; the
//!   region comes from a column when present, otherwise from `--region`
//!
//! Behavior:
//! - **Strict schema**: a missing date/value column (or region with no fallback)
//!   is a malformed-series error
//! - **Row-level validation**: unparsable rows are collected with their line
//!   number; the caller decides whether they are fatal
//! - No normalization here: sorting, differencing and gap checks belong to the
//!   `IncidenceNormalizer`

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use clap::ValueEnum;
use csv::StringRecord;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{ObservationRow, ObservationTable, SeriesKind};
use crate::error::{AppError, EstimationError};

/// Layout of the input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SourceFormat {
    /// ISO dates, region column, cumulative totals.
    #[default]
    Cumulative,
    /// Localized dates, daily new cases.
    LocalizedDaily,
}

impl SourceFormat {
    pub fn series_kind(self) -> SeriesKind {
        match self {
            SourceFormat::Cumulative => SeriesKind::Cumulative,
            SourceFormat::LocalizedDaily => SeriesKind::Daily,
        }
    }

    fn date_candidates(self) -> &'static [&'static str] {
        match self {
            SourceFormat::Cumulative => &["date"],
            SourceFormat::LocalizedDaily => &["日付", "date"],
        }
    }

    fn region_candidates(self) -> &'static [&'static str] {
        match self {
            SourceFormat::Cumulative => &["region", "state", "prefecture"],
            SourceFormat::LocalizedDaily => &["都道府県", "region"],
        }
    }

    fn value_candidates(self) -> &'static [&'static str] {
        match self {
            SourceFormat::Cumulative => &["cumulative", "confirmed", "cases", "value"],
            SourceFormat::LocalizedDaily => &["新規陽性者数", "new_cases", "cases", "value"],
        }
    }

    fn date_formats(self) -> &'static [&'static str] {
        match self {
            SourceFormat::Cumulative => &["%Y-%m-%d"],
            SourceFormat::LocalizedDaily => &["%Y年%m月%d日", "%Y-%m-%d", "%Y/%m/%d"],
        }
    }
}

/// Column overrides and fallbacks for one ingest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IngestOptions {
    pub format: SourceFormat,
    /// Date column name; the format's usual names are tried when unset.
    pub date_column: Option<String>,
    pub region_column: Option<String>,
    pub value_column: Option<String>,
    /// Region used when the file has no region column.
    pub default_region: Option<String>,
}

impl IngestOptions {
    pub fn new(format: SourceFormat) -> Self {
        Self {
            format,
            ..Self::default()
        }
    }
}

/// A row-level error encountered during ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: parsed rows plus what was skipped.
#[derive(Debug, Clone)]
pub struct IngestedTable {
    pub table: ObservationTable,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

impl IngestedTable {
    pub fn rows_used(&self) -> usize {
        self.table.rows.len()
    }

    /// Fail on the first skipped row.
    pub fn ensure_clean(&self) -> Result<(), EstimationError> {
        match self.row_errors.first() {
            Some(err) => Err(EstimationError::malformed(format!(
                "line {}: {} ({} bad row(s) in total)",
                err.line,
                err.message,
                self.row_errors.len()
            ))),
            None => Ok(()),
        }
    }
}

/// Resolved column positions.
struct Columns {
    date: usize,
    region: Option<usize>,
    value: usize,
}

/// Open `path` and ingest it.
pub fn load_observations(path: &Path, options: &IngestOptions) -> Result<IngestedTable, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;
    read_observations(file, options).map_err(AppError::from)
}

/// Ingest CSV text from any reader.
pub fn read_observations<R: Read>(source: R, options: &IngestOptions) -> Result<IngestedTable, EstimationError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(source);

    let headers = reader
        .headers()
        .map_err(|e| EstimationError::malformed(format!("failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);
    let columns = resolve_columns(&header_map, options)?;

    let mut rows = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // Records start on line 2, after the header.
        let line = idx + 2;
        rows_read += 1;

        let parsed = result
            .map_err(|e| format!("CSV parse error: {e}"))
            .and_then(|record| parse_row(&record, &columns, options));
        match parsed {
            Ok(row) => rows.push(row),
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    debug!(
        format = ?options.format,
        rows_read,
        rows_used = rows.len(),
        row_errors = row_errors.len(),
        "ingested observations"
    );

    if rows.is_empty() {
        return Err(EstimationError::insufficient(1, 0));
    }

    Ok(IngestedTable {
        table: ObservationTable {
            kind: options.format.series_kind(),
            rows,
        },
        row_errors,
        rows_read,
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_lowercase()
}

fn find_column(
    header_map: &HashMap<String, usize>,
    explicit: Option<&str>,
    candidates: &[&str],
) -> Result<Option<usize>, String> {
    if let Some(name) = explicit {
        return header_map
            .get(&normalize_header_name(name))
            .copied()
            .map(Some)
            .ok_or_else(|| format!("missing column `{name}`"));
    }
    Ok(candidates
        .iter()
        .find_map(|c| header_map.get(&normalize_header_name(c)).copied()))
}

fn resolve_columns(header_map: &HashMap<String, usize>, options: &IngestOptions) -> Result<Columns, EstimationError> {
    let format = options.format;
    let required = |explicit: Option<&str>, candidates: &[&str], what: &str| {
        find_column(header_map, explicit, candidates)
            .and_then(|idx| idx.ok_or_else(|| format!("missing {what} column (tried: {})", candidates.join(", "))))
            .map_err(EstimationError::malformed)
    };

    let date = required(options.date_column.as_deref(), format.date_candidates(), "date")?;
    let value = required(options.value_column.as_deref(), format.value_candidates(), "value")?;
    let region = find_column(header_map, options.region_column.as_deref(), format.region_candidates())
        .map_err(EstimationError::malformed)?;

    if region.is_none() && options.default_region.is_none() {
        return Err(EstimationError::malformed(
            "no region column found; pass a region to label the series",
        ));
    }

    Ok(Columns { date, region, value })
}

fn parse_row(record: &StringRecord, columns: &Columns, options: &IngestOptions) -> Result<ObservationRow, String> {
    let date = parse_date(get_required(record, columns.date, "date")?, options.format)?;
    let value = parse_count(get_required(record, columns.value, "value")?)?;

    let region = match columns.region.and_then(|idx| get_optional(record, idx)) {
        Some(region) => region.to_string(),
        None => options
            .default_region
            .clone()
            .ok_or_else(|| "missing region value".to_string())?,
    };

    Ok(ObservationRow { date, region, value })
}

fn get_required<'a>(record: &'a StringRecord, idx: usize, name: &str) -> Result<&'a str, String> {
    get_optional(record, idx).ok_or_else(|| format!("missing {name} value"))
}

fn get_optional(record: &StringRecord, idx: usize) -> Option<&str> {
    record.get(idx).map(str::trim).filter(|s| !s.is_empty())
}

fn parse_date(s: &str, format: SourceFormat) -> Result<NaiveDate, String> {
    for fmt in format.date_formats() {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d);
        }
    }
    Err(format!(
        "invalid date '{s}' (expected {})",
        format.date_formats().join(" or ")
    ))
}

/// Counts may carry thousands separators (`1,234`).
fn parse_count(s: &str) -> Result<f64, String> {
    let cleaned: String = s.chars().filter(|c| *c != ',').collect();
    let v = cleaned
        .parse::<f64>()
        .map_err(|_| format!("invalid count '{s}'"))?;
    if v.is_finite() {
        Ok(v)
    } else {
        Err(format!("non-finite count '{s}'"))
    }
}
