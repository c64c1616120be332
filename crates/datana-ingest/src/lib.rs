//! # datana-ingest
//!
//! Loaders that turn already-tabular input into [`Row`]s.
//!
//! This crate provides:
//! - JSON: a top-level array of row objects, or the upload-analysis
//!   envelope carrying the rows under `raw_data`
//! - CSV: header row plus records, every cell as text
//! - Format detection by file extension
//!
//! ## Example
//!
//! ```rust
//! use datana_ingest::parse_json;
//!
//! let rows = parse_json(r#"{"raw_data": [{"Tên": "Áo", "Giá": "150,000"}]}"#).unwrap();
//! assert_eq!(rows.len(), 1);
//! assert_eq!(rows[0].keys().collect::<Vec<_>>(), vec!["Tên", "Giá"]);
//! ```

pub mod delimited;
pub mod json;

use std::path::Path;

use datana_core::{IngestError, Row};

pub use delimited::{parse_csv, parse_csv_bytes};
pub use json::parse_json;

/// Supported input formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// JSON rows or upload envelope (.json and anything unrecognized)
    Json,
    /// Comma-separated values (.csv)
    Csv,
}

/// Detect file format from extension
pub fn detect_format(path: &Path) -> FileFormat {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("csv") => FileFormat::Csv,
        _ => FileFormat::Json,
    }
}

/// Parse rows from a string in the given format
pub fn parse_str(input: &str, format: FileFormat) -> Result<Vec<Row>, IngestError> {
    match format {
        FileFormat::Json => parse_json(input),
        FileFormat::Csv => parse_csv(input),
    }
}

/// Load rows from a file (auto-detects format)
pub fn load_file(path: &Path) -> Result<Vec<Row>, IngestError> {
    let format = detect_format(path);
    let rows = match format {
        FileFormat::Csv => parse_csv_bytes(&std::fs::read(path)?)?,
        FileFormat::Json => parse_json(&std::fs::read_to_string(path)?)?,
    };
    tracing::debug!(path = %path.display(), ?format, rows = rows.len(), "loaded rows");
    Ok(rows)
}
