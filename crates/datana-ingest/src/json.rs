//! JSON rows
//!
//! Accepted shapes:
//!
//! ```json
//! [{"Product": "A", "Revenue": 10}]
//! {"summary": {...}, "raw_data": [{"Product": "A", "Revenue": 10}]}
//! ```
//!
//! A `null` `raw_data` is an empty dataset. Cells must be scalars.

use datana_core::{IngestError, Row};
use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum Document {
    Rows(Vec<Row>),
    Envelope {
        #[serde(deserialize_with = "null_as_empty")]
        raw_data: Vec<Row>,
    },
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Row>, D::Error> {
    Ok(Option::<Vec<Row>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Parse a JSON row array or upload envelope
pub fn parse_json(input: &str) -> Result<Vec<Row>, IngestError> {
    match serde_json::from_str::<Document>(input) {
        Ok(Document::Rows(rows)) => Ok(rows),
        Ok(Document::Envelope { raw_data }) => Ok(raw_data),
        Err(_) => Err(classify(input)),
    }
}

/// Untagged errors say nothing useful; tell syntax errors from wrong shapes
fn classify(input: &str) -> IngestError {
    match serde_json::from_str::<serde_json::Value>(input) {
        Err(e) => IngestError::Json(e.to_string()),
        Ok(serde_json::Value::Array(_)) => IngestError::UnsupportedShape(
            "array elements must be objects of scalar cells".into(),
        ),
        Ok(serde_json::Value::Object(map)) if map.contains_key("raw_data") => {
            IngestError::UnsupportedShape("raw_data must be an array of objects of scalar cells".into())
        }
        Ok(serde_json::Value::Object(_)) => {
            IngestError::UnsupportedShape("object without raw_data".into())
        }
        Ok(other) => IngestError::UnsupportedShape(format!("top-level {}", kind(&other))),
    }
}

fn kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use datana_core::Value;
    use pretty_assertions::assert_eq;

    #[test]
    fn top_level_array() {
        let rows = parse_json(r#"[{"B": 1, "A": "x"}, {"C": null}]"#).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].keys().collect::<Vec<_>>(), vec!["B", "A"]);
        assert_eq!(rows[1].get("C"), Some(&Value::Empty));
    }

    #[test]
    fn envelope_ignores_other_members() {
        let rows = parse_json(
            r#"{"summary": {"total": 3}, "columns": ["Name"], "raw_data": [{"Name": "A"}]}"#,
        )
        .unwrap();
        assert_eq!(rows, vec![Row::new().with("Name", "A")]);
    }

    #[test]
    fn null_raw_data_is_empty() {
        assert!(parse_json(r#"{"raw_data": null}"#).unwrap().is_empty());
        assert!(parse_json("[]").unwrap().is_empty());
    }

    #[test]
    fn syntax_error() {
        let err = parse_json("[{").unwrap_err();
        assert!(matches!(err, IngestError::Json(_)));
    }

    #[test]
    fn wrong_shapes() {
        for input in ["42", r#"{"rows": []}"#, "[1, 2]", r#"{"raw_data": "x"}"#] {
            let err = parse_json(input).unwrap_err();
            assert!(matches!(err, IngestError::UnsupportedShape(_)), "{}", input);
        }
    }

    #[test]
    fn nested_cells_are_rejected() {
        let err = parse_json(r#"[{"A": {"nested": 1}}]"#).unwrap_err();
        assert!(matches!(err, IngestError::UnsupportedShape(_)));
    }
}
