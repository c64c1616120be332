//! # datana-core
//!
//! Core domain model for the datana dashboard engine.
//!
//! This crate provides:
//! - Cell and row types: `Value`, `Row`
//! - Logical business fields: `FieldKey` with its synonym candidates
//! - Derived views: `NormalizedRecord`, `FilterSet`
//! - Aggregated output: `DashboardSeries` and its parts (see [`series`])
//! - Error types and the `Renderer` trait
//!
//! ## Example
//!
//! ```rust
//! use datana_core::{FieldKey, Row, Value};
//!
//! let row = Row::new()
//!     .with("Product", "Laptop")
//!     .with("Đơn Giá", "1,200")
//!     .with("Qty", 3.0);
//!
//! assert_eq!(row.len(), 3);
//! assert_eq!(row.get("Qty"), Some(&Value::Number(3.0)));
//! assert!(FieldKey::Price.synonyms().contains(&"đơn giá"));
//! ```

pub mod series;

pub use series::{
    DashboardSeries, GroupEntry, GroupTotals, GrowthMarker, GrowthPoint, MarginBand,
    ProductStat, RankedRecord, ScatterPoint,
};

use chrono::NaiveDate;
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// Value
// ============================================================================

/// A single spreadsheet cell as handed over by the upload service
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Missing or null cell
    #[default]
    Empty,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Value {
    /// Truthiness as the browser sees it: empty, `false`, `0`, `NaN` and `""` are falsy
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Empty => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Text(s) => !s.is_empty(),
        }
    }

    /// True for a missing cell or an empty string (whitespace is not empty)
    pub fn is_blank(&self) -> bool {
        matches!(self, Value::Empty) || matches!(self, Value::Text(s) if s.is_empty())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Empty => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) if *n == 0.0 => f.write_str("0"),
            Value::Number(n) if n.is_nan() => f.write_str("NaN"),
            Value::Number(n) => write_js_number(f, *n),
            Value::Text(s) => f.write_str(s),
        }
    }
}

/// Number text as the browser prints it: exponent form from `1e21` up and
/// below `1e-6`, with an explicit `+` on positive exponents
fn write_js_number(f: &mut fmt::Formatter<'_>, n: f64) -> fmt::Result {
    if n.is_infinite() {
        return f.write_str(if n > 0.0 { "Infinity" } else { "-Infinity" });
    }
    let magnitude = n.abs();
    if (1e-6..1e21).contains(&magnitude) {
        return write!(f, "{}", n);
    }
    let text = format!("{:e}", n);
    match text.split_once('e') {
        Some((mantissa, exp)) if !exp.starts_with('-') => write!(f, "{}e+{}", mantissa, exp),
        _ => f.write_str(&text),
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

// ============================================================================
// Row
// ============================================================================

/// One uploaded spreadsheet row.
///
/// Keys are kept exactly as supplied, in insertion order. Column resolution
/// depends on that order (first match wins), so the row is an ordered list
/// rather than a hash map.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Row {
    cells: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a cell (builder pattern)
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert a cell. A repeated key keeps its original position and takes the new value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        match self.cells.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.cells.push((key, value)),
        }
    }

    /// Exact (case-sensitive) key lookup
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.cells.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.cells.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (k, v) in iter {
            row.insert(k, v);
        }
        row
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (k, v) in &self.cells {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Row {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RowVisitor;

        impl<'de> Visitor<'de> for RowVisitor {
            type Value = Row;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object of column name to scalar cell")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Row, A::Error> {
                let mut row = Row::new();
                while let Some((key, value)) = access.next_entry::<String, Value>()? {
                    row.insert(key, value);
                }
                Ok(row)
            }
        }

        deserializer.deserialize_map(RowVisitor)
    }
}

// ============================================================================
// Field keys
// ============================================================================

/// The eight logical business fields the engine understands
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKey {
    Product,
    Quantity,
    Price,
    Profit,
    Revenue,
    Brand,
    Category,
    Date,
}

impl FieldKey {
    pub const ALL: [FieldKey; 8] = [
        FieldKey::Product,
        FieldKey::Quantity,
        FieldKey::Price,
        FieldKey::Profit,
        FieldKey::Revenue,
        FieldKey::Brand,
        FieldKey::Category,
        FieldKey::Date,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKey::Product => "product",
            FieldKey::Quantity => "quantity",
            FieldKey::Price => "price",
            FieldKey::Profit => "profit",
            FieldKey::Revenue => "revenue",
            FieldKey::Brand => "brand",
            FieldKey::Category => "category",
            FieldKey::Date => "date",
        }
    }

    /// Built-in candidate column names, lower-case, English and Vietnamese
    pub fn synonyms(&self) -> &'static [&'static str] {
        match self {
            FieldKey::Product => &[
                "name",
                "product",
                "item",
                "sku",
                "tên",
                "sản phẩm",
                "product name",
            ],
            FieldKey::Quantity => &[
                "quantity sold",
                "quantity",
                "qty",
                "units",
                "số lượng",
                "sl",
                "orders",
                "quantity_sold",
            ],
            FieldKey::Price => &["price", "unit price", "giá", "đơn giá", "cost", "unit_price"],
            FieldKey::Profit => &["profit", "margin", "lợi nhuận", "lãi", "lợi_nhuận"],
            FieldKey::Revenue => &[
                "revenue",
                "sales",
                "amount",
                "doanh thu",
                "total",
                "gross",
                "doanh_thu",
            ],
            FieldKey::Brand => &["brand", "hãng", "thương hiệu", "thương_hiệu"],
            FieldKey::Category => &["category", "ngành hàng", "danh mục", "segment", "danh_mục"],
            FieldKey::Date => &[
                "date",
                "ngày",
                "day",
                "month",
                "time",
                "order date",
                "order_date",
            ],
        }
    }

    /// Whether the field carries a number (as opposed to text)
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            FieldKey::Quantity | FieldKey::Price | FieldKey::Profit | FieldKey::Revenue
        )
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        FieldKey::ALL
            .into_iter()
            .find(|k| k.as_str() == lower)
            .ok_or_else(|| format!("unknown field '{}'", s))
    }
}

// ============================================================================
// Normalized record
// ============================================================================

/// Typed view over a [`Row`] with every logical field resolved.
///
/// Text fields are empty when nothing resolved; numeric fields are zero.
/// Placeholder labels ("Unknown", "Khác", ...) are applied later, at
/// aggregation time, so filters still see the raw text.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedRecord {
    pub product: String,
    /// Strict product name (literal `name`/`product`/`tên` columns first)
    pub display_name: String,
    pub brand: String,
    pub category: String,
    pub date: String,
    pub quantity: f64,
    pub price: f64,
    pub profit: f64,
    pub revenue: f64,
    /// Revenue was back-filled from price × quantity
    pub revenue_derived: bool,
}

impl NormalizedRecord {
    /// Text value of a text field, or the number formatted for numeric ones
    pub fn text(&self, key: FieldKey) -> String {
        match key {
            FieldKey::Product => self.product.clone(),
            FieldKey::Brand => self.brand.clone(),
            FieldKey::Category => self.category.clone(),
            FieldKey::Date => self.date.clone(),
            _ => Value::Number(self.number(key)).to_string(),
        }
    }

    /// Numeric value of a numeric field; text fields yield 0
    pub fn number(&self, key: FieldKey) -> f64 {
        match key {
            FieldKey::Quantity => self.quantity,
            FieldKey::Price => self.price,
            FieldKey::Profit => self.profit,
            FieldKey::Revenue => self.revenue,
            _ => 0.0,
        }
    }

    /// A record nothing numeric could be read from.
    ///
    /// Such rows contribute zero everywhere; callers should report them as
    /// "row could not be understood" rather than as a real business zero.
    pub fn is_unreadable(&self) -> bool {
        self.quantity == 0.0 && self.price == 0.0 && self.profit == 0.0 && self.revenue == 0.0
    }
}

// ============================================================================
// Filters
// ============================================================================

/// Dashboard filter selection.
///
/// Empty sets and absent bounds do not restrict anything.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterSet {
    #[serde(deserialize_with = "blank_date")]
    pub start_date: Option<NaiveDate>,
    #[serde(deserialize_with = "blank_date")]
    pub end_date: Option<NaiveDate>,
    pub categories: BTreeSet<String>,
    pub brands: BTreeSet<String>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the inclusive start date (builder pattern)
    pub fn from_date(mut self, date: NaiveDate) -> Self {
        self.start_date = Some(date);
        self
    }

    /// Set the inclusive end date (builder pattern)
    pub fn to_date(mut self, date: NaiveDate) -> Self {
        self.end_date = Some(date);
        self
    }

    /// Allow a category (builder pattern)
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.categories.insert(category.into());
        self
    }

    /// Allow a brand (builder pattern)
    pub fn brand(mut self, brand: impl Into<String>) -> Self {
        self.brands.insert(brand.into());
        self
    }

    pub fn has_date_bounds(&self) -> bool {
        self.start_date.is_some() || self.end_date.is_some()
    }

    /// True when the filter lets every record through
    pub fn is_empty(&self) -> bool {
        !self.has_date_bounds() && self.categories.is_empty() && self.brands.is_empty()
    }
}

/// Date pickers submit `""` when cleared
fn blank_date<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveDate>, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(|e| de::Error::custom(format!("invalid date '{}': {}", s, e))),
    }
}

// ============================================================================
// Traits
// ============================================================================

/// Output rendering of an aggregated dashboard
pub trait Renderer {
    type Output;

    /// Render the series to the output format
    fn render(&self, series: &DashboardSeries) -> Result<Self::Output, RenderError>;
}

// ============================================================================
// Errors
// ============================================================================

/// Failure to load rows from an input source
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(String),

    #[error("CSV error at record {record}: {message}")]
    Csv { record: usize, message: String },

    #[error("Unsupported input shape: {0}")]
    UnsupportedShape(String),
}

/// Rendering error
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Format error: {0}")]
    Format(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn value_truthiness_matches_browser_rules() {
        assert!(!Value::Empty.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(!Value::Number(0.0).is_truthy());
        assert!(!Value::Number(f64::NAN).is_truthy());
        assert!(!Value::Text(String::new()).is_truthy());
        assert!(Value::Text(" ".into()).is_truthy());
        assert!(Value::Number(-1.0).is_truthy());
    }

    #[test]
    fn value_display_drops_integer_fraction() {
        assert_eq!(Value::Number(1000.0).to_string(), "1000");
        assert_eq!(Value::Number(1.5).to_string(), "1.5");
        assert_eq!(Value::Number(-0.0).to_string(), "0");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::Empty.to_string(), "");
    }

    #[test]
    fn value_display_uses_exponent_form_at_the_extremes() {
        assert_eq!(Value::Number(1e21).to_string(), "1e+21");
        assert_eq!(Value::Number(1.5e22).to_string(), "1.5e+22");
        assert_eq!(Value::Number(1e20).to_string(), "100000000000000000000");
        assert_eq!(Value::Number(1e-7).to_string(), "1e-7");
        assert_eq!(Value::Number(-2.5e-8).to_string(), "-2.5e-8");
        assert_eq!(Value::Number(0.000001).to_string(), "0.000001");
        assert_eq!(Value::Number(f64::INFINITY).to_string(), "Infinity");
        assert_eq!(Value::Number(f64::NEG_INFINITY).to_string(), "-Infinity");
    }

    #[test]
    fn row_insert_keeps_first_position() {
        let mut row = Row::new().with("a", 1.0).with("b", 2.0);
        row.insert("a", 3.0);
        let keys: Vec<&str> = row.keys().collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(row.get("a"), Some(&Value::Number(3.0)));
    }

    #[test]
    fn row_deserializes_in_document_order() {
        let row: Row =
            serde_json::from_str(r#"{"Zeta": 1, "Alpha": "x", "Mid": null, "Flag": true}"#)
                .unwrap();
        let keys: Vec<&str> = row.keys().collect();
        assert_eq!(keys, vec!["Zeta", "Alpha", "Mid", "Flag"]);
        assert_eq!(row.get("Mid"), Some(&Value::Empty));
        assert_eq!(row.get("Flag"), Some(&Value::Bool(true)));
    }

    #[test]
    fn row_serializes_as_object() {
        let row = Row::new().with("Name", "A").with("Qty", 2.0);
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"{"Name":"A","Qty":2.0}"#);
    }

    #[test]
    fn field_key_from_str() {
        assert_eq!("Price".parse::<FieldKey>(), Ok(FieldKey::Price));
        assert_eq!(" date ".parse::<FieldKey>(), Ok(FieldKey::Date));
        assert!("region".parse::<FieldKey>().is_err());
    }

    #[test]
    fn every_field_lists_its_own_name() {
        for key in FieldKey::ALL {
            assert!(key.synonyms().contains(&key.as_str()), "{}", key);
        }
    }

    #[test]
    fn filter_set_accepts_blank_dates() {
        let filters: FilterSet = serde_json::from_str(
            r#"{"startDate": "", "endDate": "2024-03-31", "categories": ["Phone"], "brands": []}"#,
        )
        .unwrap();
        assert_eq!(filters.start_date, None);
        assert_eq!(filters.end_date, NaiveDate::from_ymd_opt(2024, 3, 31));
        assert!(filters.categories.contains("Phone"));
        assert!(!filters.is_empty());
    }

    #[test]
    fn filter_set_rejects_garbage_date() {
        let result: Result<FilterSet, _> = serde_json::from_str(r#"{"startDate": "soon"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn unreadable_record() {
        let record = NormalizedRecord {
            product: "Mystery".into(),
            ..Default::default()
        };
        assert!(record.is_unreadable());
        assert_eq!(record.text(FieldKey::Revenue), "0");
    }
}
