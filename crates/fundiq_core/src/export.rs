//! crates/fundiq_core/src/export.rs
//!
//! CSV and JSON renderings of a document's extracted rows. Exports always cover
//! the full row set, never a filtered view.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt::Write as _;

use crate::domain::ExtractedRow;
use crate::review::display_value;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv",
            ExportFormat::Json => "application/json",
        }
    }
}

/// A rendered export, ready to hand out as a download.
#[derive(Debug, Clone, PartialEq)]
pub struct Export {
    pub file_name: String,
    pub format: ExportFormat,
    pub body: String,
}

/// `<originalFileName>_extracted.<ext>`
pub fn export_file_name(original: &str, format: ExportFormat) -> String {
    format!("{}_extracted.{}", original, format.extension())
}

fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// Header line of column names, then one line per row; missing fields are empty.
pub fn to_csv(columns: &[String], rows: &[ExtractedRow]) -> String {
    let mut out = String::new();
    let header: Vec<String> = columns.iter().map(|c| escape_csv(c)).collect();
    let _ = writeln!(out, "{}", header.join(","));

    for row in rows {
        let cells: Vec<String> = columns
            .iter()
            .map(|c| escape_csv(&display_value(row.raw_json.get(c))))
            .collect();
        let _ = writeln!(out, "{}", cells.join(","));
    }
    out
}

/// Pretty-printed array of each row's raw field mapping.
pub fn to_json(rows: &[ExtractedRow]) -> serde_json::Result<String> {
    let raw: Vec<&Map<String, Value>> = rows.iter().map(|r| &r.raw_json).collect();
    serde_json::to_string_pretty(&raw)
}
