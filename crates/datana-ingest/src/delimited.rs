//! CSV rows
//!
//! The first record is the header. Cells stay text; an empty cell is
//! [`Value::Empty`]. Short records are allowed and simply lack the trailing
//! columns.

use std::io::Read;

use datana_core::{IngestError, Row, Value};

const BOM: &[u8] = b"\xEF\xBB\xBF";

/// Parse CSV text with a header row
pub fn parse_csv(input: &str) -> Result<Vec<Row>, IngestError> {
    parse_csv_bytes(input.as_bytes())
}

/// Parse raw CSV bytes; invalid UTF-8 is reported with its record number
pub fn parse_csv_bytes(input: &[u8]) -> Result<Vec<Row>, IngestError> {
    parse_csv_reader(input.strip_prefix(BOM).unwrap_or(input))
}

fn parse_csv_reader<R: Read>(input: R) -> Result<Vec<Row>, IngestError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(input);

    let headers = reader.headers().map_err(|e| csv_error(e, 0))?.clone();

    let mut rows = Vec::new();
    for (index, result) in reader.records().enumerate() {
        let record = result.map_err(|e| csv_error(e, index + 1))?;
        let row: Row = headers
            .iter()
            .zip(record.iter())
            .map(|(header, cell)| (header, cell_value(cell)))
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

fn cell_value(cell: &str) -> Value {
    if cell.is_empty() {
        Value::Empty
    } else {
        Value::Text(cell.to_string())
    }
}

fn csv_error(err: csv::Error, fallback_record: usize) -> IngestError {
    let message = err.to_string();
    let record = err
        .position()
        .map(|p| p.record() as usize)
        .filter(|r| *r > 0)
        .unwrap_or(fallback_record);

    match err.into_kind() {
        csv::ErrorKind::Io(e) => IngestError::Io(e),
        _ => IngestError::Csv { record, message },
    }
}
