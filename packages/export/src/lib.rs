#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CSV and JSON serialization for extracted rebate results.
//!
//! Two lossless output shapes: a row-oriented table (one CSV record per
//! rebate row, fixed column order) and a nested document (doc id, rows,
//! provenance) as JSON.

use std::io::Write;

use rebate_docs_extract_models::{DocumentResult, RebateRow};

/// Fixed CSV column order.
pub const CSV_COLUMNS: [&str; 13] = [
    "rebate_type",
    "program_id",
    "published_date",
    "program_start_date",
    "program_end_date",
    "model_year",
    "model",
    "trim",
    "amount_dollars",
    "currency",
    "exclusions",
    "page",
    "confidence",
];

/// Errors that can occur while writing results.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV serialization failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Writes the row list as CSV with the [`CSV_COLUMNS`] header.
///
/// # Errors
///
/// Returns [`ExportError`] if writing or CSV serialization fails.
pub fn write_csv<W: Write>(result: &DocumentResult, writer: W) -> Result<(), ExportError> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(CSV_COLUMNS)?;
    for row in &result.rows {
        out.write_record(csv_record(row))?;
    }
    out.flush()?;
    log::debug!("wrote {} CSV rows for {}", result.rows.len(), result.doc_id);
    Ok(())
}

/// Renders the result as a CSV string.
///
/// # Errors
///
/// Returns [`ExportError`] if CSV serialization fails.
pub fn csv_string(result: &DocumentResult) -> Result<String, ExportError> {
    let mut buffer = Vec::new();
    write_csv(result, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// Writes the nested document format as pretty-printed JSON.
///
/// # Errors
///
/// Returns [`ExportError`] if writing or JSON serialization fails.
pub fn write_json<W: Write>(result: &DocumentResult, mut writer: W) -> Result<(), ExportError> {
    serde_json::to_writer_pretty(&mut writer, result)?;
    writer.write_all(b"\n")?;
    Ok(())
}

/// Renders the result as a pretty-printed JSON string.
///
/// # Errors
///
/// Returns [`ExportError`] if JSON serialization fails.
pub fn json_string(result: &DocumentResult) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(result)?)
}

fn csv_record(row: &RebateRow) -> [String; 13] {
    [
        row.rebate_type.clone().unwrap_or_default(),
        row.program_id.clone().unwrap_or_default(),
        row.published_date.clone().unwrap_or_default(),
        row.program_start_date.clone().unwrap_or_default(),
        row.program_end_date.clone().unwrap_or_default(),
        row.model_year.map(|y| y.to_string()).unwrap_or_default(),
        row.model.clone().unwrap_or_default(),
        row.trim.clone().unwrap_or_default(),
        row.amount_dollars
            .map(|a| a.to_string())
            .unwrap_or_default(),
        row.currency.clone(),
        row.exclusions.clone().unwrap_or_default(),
        row.page.to_string(),
        row.confidence.to_string(),
    ]
}
