//! Fuzzy column resolution
//!
//! Uploaded spreadsheets name their columns however they like: `Price`,
//! `Đơn Giá`, `unit_price`, `Total Sales (VND)`. The resolver maps each
//! logical [`FieldKey`] onto one concrete column of a row in three tiers:
//!
//! 1. **Exact**: the first row key whose trimmed lower-case form equals a
//!    candidate synonym.
//! 2. **Partial**: the first row key that contains a candidate, or is
//!    contained in one.
//! 3. **Direct**: `row[field name]` if present and truthy.
//!
//! Row keys are scanned in insertion order, so the first matching column
//! wins. Resolution never fails; the typed accessors degrade to `""` and `0`.

use std::collections::BTreeMap;
use std::fmt;

use datana_core::{FieldKey, Row, Value};
use serde::Serialize;

/// Literal product-name columns, in priority order
const NAME_KEYS: [&str; 6] = ["Name", "name", "Product", "product", "Tên", "tên"];

/// Column resolver holding the candidate synonyms per field
#[derive(Clone, Debug, PartialEq)]
pub struct FieldResolver {
    candidates: BTreeMap<FieldKey, Vec<String>>,
}

impl Default for FieldResolver {
    fn default() -> Self {
        let candidates = FieldKey::ALL
            .into_iter()
            .map(|key| {
                let list = key.synonyms().iter().map(|s| s.to_string()).collect();
                (key, list)
            })
            .collect();
        Self { candidates }
    }
}

impl FieldResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append extra candidates to a field (lower-cased, trimmed, deduplicated)
    pub fn add_synonyms<I, S>(&mut self, key: FieldKey, extra: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let list = self.candidates.entry(key).or_default();
        for synonym in extra {
            let synonym = synonym.as_ref().trim().to_lowercase();
            if !synonym.is_empty() && !list.contains(&synonym) {
                list.push(synonym);
            }
        }
    }

    /// Add synonyms (builder pattern)
    pub fn with_synonyms<I, S>(mut self, key: FieldKey, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.add_synonyms(key, extra);
        self
    }

    pub fn candidates(&self, key: FieldKey) -> &[String] {
        self.candidates.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Resolve a field to the value of the best-matching column
    pub fn resolve<'r>(&self, row: &'r Row, key: FieldKey) -> Option<&'r Value> {
        resolve_with(row, self.candidates(key), key.as_str())
    }

    /// Resolve by field name. Names outside [`FieldKey`] use themselves as the only candidate.
    pub fn resolve_named<'r>(&self, row: &'r Row, name: &str) -> Option<&'r Value> {
        match FieldKey::ALL.into_iter().find(|k| k.as_str() == name) {
            Some(key) => self.resolve(row, key),
            None => resolve_with(row, &[name.to_lowercase()], name),
        }
    }

    /// Resolved value as trimmed text, `""` when nothing resolved
    pub fn text(&self, row: &Row, key: FieldKey) -> String {
        text_of(self.resolve(row, key))
    }

    /// Resolved value as a number, `0` when nothing resolved or the cell is not numeric
    pub fn number(&self, row: &Row, key: FieldKey) -> f64 {
        number_of(self.resolve(row, key))
    }

    /// Strict product name.
    ///
    /// A literal `name`/`product`/`tên` column always wins over the fuzzy
    /// match, which might otherwise land on `Product Category` or `SKU`.
    pub fn product_name(&self, row: &Row) -> String {
        for name in NAME_KEYS {
            if let Some(text) = row.get(name).and_then(non_blank) {
                return text;
            }
            let lower = name.to_lowercase();
            let found = row
                .iter()
                .filter(|(key, _)| key.to_lowercase() == lower)
                .find_map(|(_, value)| non_blank(value));
            if let Some(text) = found {
                return text;
            }
        }

        let fuzzy = self.text(row, FieldKey::Product);
        if !fuzzy.is_empty() {
            return fuzzy;
        }
        text_of(self.resolve_named(row, "name"))
    }

    /// Which header each field would resolve to (exact and partial tiers only)
    pub fn detect_columns<'h, I>(&self, headers: I) -> ColumnMapping
    where
        I: IntoIterator<Item = &'h str>,
    {
        let headers: Vec<&str> = headers.into_iter().collect();
        let columns = FieldKey::ALL
            .into_iter()
            .map(|key| {
                let found = match_key(headers.iter().copied(), self.candidates(key))
                    .map(|idx| headers[idx].to_string());
                (key, found)
            })
            .collect();
        ColumnMapping { columns }
    }
}

fn resolve_with<'r>(row: &'r Row, candidates: &[String], direct: &str) -> Option<&'r Value> {
    if let Some(idx) = match_key(row.keys(), candidates) {
        return row.iter().nth(idx).map(|(_, value)| value);
    }
    let value = row.get(direct).filter(|v| v.is_truthy());
    if value.is_none() {
        tracing::trace!(field = direct, "no column resolved");
    }
    value
}

/// Index of the first key matching the candidates, exact tier before partial tier
fn match_key<'k, I>(keys: I, candidates: &[String]) -> Option<usize>
where
    I: IntoIterator<Item = &'k str>,
{
    let lowered: Vec<String> = keys
        .into_iter()
        .map(|k| k.to_lowercase().trim().to_string())
        .collect();

    lowered
        .iter()
        .position(|key| candidates.iter().any(|c| key == c))
        .or_else(|| {
            lowered.iter().position(|key| {
                candidates
                    .iter()
                    .any(|c| key.contains(c.as_str()) || c.contains(key.as_str()))
            })
        })
}

fn non_blank(value: &Value) -> Option<String> {
    if matches!(value, Value::Empty) {
        return None;
    }
    let text = value.to_string();
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Text accessor over a resolved value
pub fn text_of(value: Option<&Value>) -> String {
    match value {
        None => String::new(),
        Some(v) if v.is_blank() => String::new(),
        Some(v) => v.to_string().trim().to_string(),
    }
}

/// Numeric accessor over a resolved value.
///
/// Malformed input is 0, never an error: one bad cell must not void the row.
pub fn number_of(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) if n.is_finite() => *n,
        Some(Value::Text(s)) => parse_number(s),
        _ => 0.0,
    }
}

/// Parse a spreadsheet number: commas dropped, longest leading decimal literal, else 0
pub fn parse_number(raw: &str) -> f64 {
    let cleaned: String = raw.chars().filter(|&c| c != ',').collect();
    let s = cleaned.trim();
    let end = decimal_prefix_len(s);
    s[..end]
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .unwrap_or(0.0)
}

/// Length of the leading `[sign] digits [. digits] [e [sign] digits]` literal
fn decimal_prefix_len(s: &str) -> usize {
    let b = s.as_bytes();
    let digits_from = |mut i: usize| {
        while i < b.len() && b[i].is_ascii_digit() {
            i += 1;
        }
        i
    };

    let mut i = 0;
    if i < b.len() && (b[i] == b'+' || b[i] == b'-') {
        i += 1;
    }
    let int_end = digits_from(i);
    let mut mantissa = int_end - i;
    i = int_end;

    if i < b.len() && b[i] == b'.' {
        let frac_end = digits_from(i + 1);
        let frac = frac_end - i - 1;
        if mantissa + frac > 0 {
            mantissa += frac;
            i = frac_end;
        }
    }
    if mantissa == 0 {
        return 0;
    }

    if i < b.len() && (b[i] == b'e' || b[i] == b'E') {
        let mut j = i + 1;
        if j < b.len() && (b[j] == b'+' || b[j] == b'-') {
            j += 1;
        }
        let exp_end = digits_from(j);
        if exp_end > j {
            i = exp_end;
        }
    }
    i
}

// ============================================================================
// Column mapping
// ============================================================================

/// Detected source column per field
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ColumnMapping {
    columns: Vec<(FieldKey, Option<String>)>,
}

impl ColumnMapping {
    pub fn column(&self, key: FieldKey) -> Option<&str> {
        self.columns
            .iter()
            .find(|(k, _)| *k == key)
            .and_then(|(_, c)| c.as_deref())
    }

    /// Fields no header resolved to
    pub fn missing(&self) -> Vec<FieldKey> {
        self.columns
            .iter()
            .filter(|(_, c)| c.is_none())
            .map(|(k, _)| *k)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FieldKey, Option<&str>)> {
        self.columns.iter().map(|(k, c)| (*k, c.as_deref()))
    }
}

impl fmt::Display for ColumnMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, column) in self.iter() {
            match column {
                Some(column) => writeln!(f, "{:<9} <- {}", key.as_str(), column)?,
                None => writeln!(f, "{:<9} (not found)", key.as_str())?,
            }
        }
        Ok(())
    }
}
