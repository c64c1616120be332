//! Filter predicate and filter pickers

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use datana_core::{FilterSet, NormalizedRecord};
use serde::{Deserialize, Serialize};

/// Sentinel the upload service writes for a missing date
pub const MISSING_DATE: &str = "N/A";

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];
const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Whether a record passes the filter.
///
/// Records whose date is missing or unparseable pass the date bounds; they
/// should not silently vanish from the dashboard. Category and brand
/// selections are OR-ed within each set and compared against the raw text.
pub fn matches(record: &NormalizedRecord, filters: &FilterSet) -> bool {
    if filters.has_date_bounds() && !record.date.is_empty() && record.date != MISSING_DATE {
        if let Some(date) = parse_date(&record.date) {
            if filters.start_date.is_some_and(|start| date < start) {
                return false;
            }
            if filters.end_date.is_some_and(|end| date > end) {
                return false;
            }
        }
    }

    if !filters.categories.is_empty() && !filters.categories.contains(&record.category) {
        return false;
    }

    if !filters.brands.is_empty() && !filters.brands.contains(&record.brand) {
        return false;
    }

    true
}

/// Keep the records that pass the filter
pub fn apply(records: Vec<NormalizedRecord>, filters: &FilterSet) -> Vec<NormalizedRecord> {
    if filters.is_empty() {
        return records;
    }
    let before = records.len();
    let kept: Vec<NormalizedRecord> = records.into_iter().filter(|r| matches(r, filters)).collect();
    tracing::debug!(before, after = kept.len(), "applied filters");
    kept
}

/// Parse the date formats spreadsheets usually carry.
///
/// `YYYY-MM` is the first of the month and a bare `YYYY` is 1 January.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let s = text.trim();

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return Some(date);
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt.date());
        }
    }

    let is_digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    match s.split_once('-') {
        Some((year, month)) if year.len() == 4 && is_digits(year) && month.len() <= 2 && is_digits(month) => {
            NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, 1)
        }
        None if s.len() == 4 && is_digits(s) => NaiveDate::from_ymd_opt(s.parse().ok()?, 1, 1),
        _ => None,
    }
}

/// Values offered by the category and brand pickers
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOptions {
    pub categories: Vec<String>,
    pub brands: Vec<String>,
}

/// Distinct non-empty categories and brands in first-appearance order
pub fn filter_options(records: &[NormalizedRecord]) -> FilterOptions {
    let mut options = FilterOptions::default();
    let mut seen_categories = HashSet::new();
    let mut seen_brands = HashSet::new();

    for record in records {
        if !record.category.is_empty() && seen_categories.insert(record.category.as_str()) {
            options.categories.push(record.category.clone());
        }
        if !record.brand.is_empty() && seen_brands.insert(record.brand.as_str()) {
            options.brands.push(record.brand.clone());
        }
    }
    options
}
