//! Export estimation results.
//!
//! - CSV: one row per estimated day, easy to load in spreadsheets
//! - JSON: the whole `PipelineOutput` (estimate, smoothed curve, pmfs, settings)

use std::fs::File;
use std::io::Write;
use std::path::Path;

use chrono::NaiveDate;
use serde::Serialize;

use crate::app::pipeline::PipelineOutput;
use crate::domain::RtEstimate;
use crate::error::AppError;

#[derive(Debug, Serialize)]
struct RtCsvRow<'a> {
    region: &'a str,
    date: NaiveDate,
    mean: f64,
    q025: f64,
    q50: f64,
    q975: f64,
}

/// Write R(t) tables (any number of regions) as CSV to `sink`.
pub fn write_rt_csv<W: Write>(sink: W, estimates: &[&RtEstimate]) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(sink);
    for estimate in estimates {
        for p in &estimate.points {
            writer.serialize(RtCsvRow {
                region: &estimate.region,
                date: p.date,
                mean: p.mean,
                q025: p.q025,
                q50: p.q50,
                q975: p.q975,
            })?;
        }
    }
    writer.flush()?;
    Ok(())
}

/// Write the R(t) tables of several runs to a CSV file.
pub fn export_rt_csv(path: &Path, outputs: &[&PipelineOutput]) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;
    let estimates: Vec<&RtEstimate> = outputs.iter().map(|o| &o.estimate).collect();
    write_rt_csv(file, &estimates).map_err(|e| AppError::new(2, format!("Failed to write export CSV: {e}")))
}

/// Write full run outputs as pretty JSON (an array, one entry per region).
pub fn export_json(path: &Path, outputs: &[&PipelineOutput]) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, outputs)
        .map_err(|e| AppError::new(2, format!("Failed to write export JSON: {e}")))
}
