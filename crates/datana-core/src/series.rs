//! Aggregated dashboard output
//!
//! Everything an external charting layer needs after one aggregation pass:
//! totals, per-group buckets, ranked lists, the time series with
//! month-over-month growth, and price/quantity scatter points.
//!
//! # Example
//!
//! ```rust
//! use datana_core::GroupTotals;
//!
//! let mut by_brand = GroupTotals::new();
//! by_brand.add("X", 100.0, 10.0, 1.0);
//! by_brand.add("Y", 50.0, 5.0, 1.0);
//! by_brand.add("X", 200.0, 20.0, 2.0);
//!
//! assert_eq!(by_brand.get("X").unwrap().revenue, 300.0);
//! assert_eq!(by_brand.labels(), vec!["X", "Y"]);
//! ```

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::NormalizedRecord;

// ============================================================================
// Group totals
// ============================================================================

/// Running sums for one group label
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupEntry {
    pub label: String,
    pub revenue: f64,
    pub profit: f64,
    pub quantity: f64,
}

/// Accumulator keyed by group label.
///
/// Entries keep first-appearance order so that ranking ties resolve to the
/// order in which groups were first seen.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<GroupEntry>", into = "Vec<GroupEntry>")]
pub struct GroupTotals {
    entries: Vec<GroupEntry>,
    index: HashMap<String, usize>,
}

impl GroupTotals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one record's contribution to `label`
    pub fn add(&mut self, label: &str, revenue: f64, profit: f64, quantity: f64) {
        let entry = self.entry(label);
        entry.revenue += revenue;
        entry.profit += profit;
        entry.quantity += quantity;
    }

    /// Get or create the entry for `label`
    pub fn entry(&mut self, label: &str) -> &mut GroupEntry {
        let idx = match self.index.get(label) {
            Some(&idx) => idx,
            None => {
                self.entries.push(GroupEntry {
                    label: label.to_string(),
                    ..Default::default()
                });
                self.index.insert(label.to_string(), self.entries.len() - 1);
                self.entries.len() - 1
            }
        };
        &mut self.entries[idx]
    }

    pub fn get(&self, label: &str) -> Option<&GroupEntry> {
        self.index.get(label).map(|&idx| &self.entries[idx])
    }

    pub fn entries(&self) -> &[GroupEntry] {
        &self.entries
    }

    pub fn labels(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.label.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_revenue(&self) -> f64 {
        self.entries.iter().map(|e| e.revenue).sum()
    }

    /// Entries sorted descending by `metric`; ties keep first-appearance order
    pub fn ranked_by(&self, metric: impl Fn(&GroupEntry) -> f64) -> Vec<GroupEntry> {
        let mut ranked = self.entries.clone();
        ranked.sort_by(|a, b| descending(metric(a), metric(b)));
        ranked
    }

    /// Reorder entries in place
    pub fn sort_by(&mut self, compare: impl FnMut(&GroupEntry, &GroupEntry) -> Ordering) {
        self.entries.sort_by(compare);
        self.reindex();
    }

    fn reindex(&mut self) {
        self.index = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.label.clone(), i))
            .collect();
    }
}

impl From<Vec<GroupEntry>> for GroupTotals {
    fn from(entries: Vec<GroupEntry>) -> Self {
        let mut totals = GroupTotals {
            entries,
            index: HashMap::new(),
        };
        totals.reindex();
        totals
    }
}

impl From<GroupTotals> for Vec<GroupEntry> {
    fn from(totals: GroupTotals) -> Self {
        totals.entries
    }
}

/// Descending comparison for a stable sort. Incomparable values count as equal.
pub fn descending(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

// ============================================================================
// Ranked records and product tables
// ============================================================================

/// One input record in a ranked list
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedRecord {
    /// Full product name as shown on charts
    pub label: String,
    pub product: String,
    pub brand: String,
    pub category: String,
    pub price: f64,
    pub quantity: f64,
    pub revenue: f64,
    pub profit: f64,
}

impl From<&NormalizedRecord> for RankedRecord {
    fn from(record: &NormalizedRecord) -> Self {
        Self {
            label: record.display_name.clone(),
            product: record.product.clone(),
            brand: record.brand.clone(),
            category: record.category.clone(),
            price: record.price,
            quantity: record.quantity,
            revenue: record.revenue,
            profit: record.profit,
        }
    }
}

/// Profit margin classification of a product
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarginBand {
    /// 30% and above
    Healthy,
    /// 10% up to 30%
    Normal,
    /// 0% up to 10%
    Thin,
    /// Negative margin
    Loss,
}

impl MarginBand {
    pub fn from_margin(margin: f64) -> Self {
        if margin >= 30.0 {
            MarginBand::Healthy
        } else if margin < 0.0 {
            MarginBand::Loss
        } else if margin < 10.0 {
            MarginBand::Thin
        } else {
            MarginBand::Normal
        }
    }

    /// Display color used by the dashboard tables
    pub fn color(&self) -> &'static str {
        match self {
            MarginBand::Healthy => "#10b981",
            MarginBand::Normal => "#64748b",
            MarginBand::Thin => "#f59e0b",
            MarginBand::Loss => "#ef4444",
        }
    }
}

/// Per-product totals
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductStat {
    pub label: String,
    /// Category of the first record seen for this product
    pub category: String,
    pub revenue: f64,
    pub profit: f64,
    pub quantity: f64,
    /// Profit as a percentage of revenue (0 without revenue)
    pub margin: f64,
    pub margin_band: MarginBand,
    /// Revenue per unit sold (0 without quantity)
    pub average_price: f64,
}

// ============================================================================
// Time series
// ============================================================================

/// Change of a time bucket against the previous one
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GrowthMarker {
    /// Previous bucket had no revenue, this one has some
    Start,
    Up { percent: f64 },
    Down { percent: f64 },
    Flat,
    /// Nothing to compare against
    NotComparable,
}

/// One time bucket with its growth marker
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrowthPoint {
    pub label: String,
    pub revenue: f64,
    pub profit: f64,
    pub quantity: f64,
    pub growth: GrowthMarker,
}

// ============================================================================
// Scatter
// ============================================================================

/// Price/quantity bubble for one record with positive revenue, price and quantity
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScatterPoint {
    /// Unit price
    pub x: f64,
    /// Quantity
    pub y: f64,
    /// Bubble radius, log-dampened profit in [3, 8]
    pub r: f64,
    pub label: String,
}

impl ScatterPoint {
    pub fn price(&self) -> f64 {
        self.x
    }

    pub fn quantity(&self) -> f64 {
        self.y
    }

    pub fn weight(&self) -> f64 {
        self.r
    }
}

// ============================================================================
// Dashboard series
// ============================================================================

/// Everything the dashboard displays for one filter selection
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSeries {
    pub row_count: usize,
    pub total_revenue: f64,
    pub total_profit: f64,
    pub total_quantity: f64,
    /// Total profit as a percentage of total revenue
    pub average_margin: f64,
    /// Product of the highest-revenue record
    pub top_product: Option<String>,
    /// Records that resolved no numeric field at all
    pub unreadable_rows: usize,

    pub by_brand: GroupTotals,
    pub by_category: GroupTotals,
    /// Sorted by the configured bucket order
    pub by_time_bucket: GroupTotals,

    pub top_by_revenue: Vec<RankedRecord>,
    pub top_by_profit: Vec<RankedRecord>,
    pub detail_rows: Vec<RankedRecord>,
    pub top_brands: Vec<GroupEntry>,
    pub top_categories: Vec<GroupEntry>,
    pub product_stats: Vec<ProductStat>,
    pub best_sellers: Vec<ProductStat>,
    pub monthly_growth: Vec<GrowthPoint>,

    pub scatter_points: Vec<ScatterPoint>,
}

impl DashboardSeries {
    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn group_totals_accumulate_in_first_seen_order() {
        let mut totals = GroupTotals::new();
        totals.add("b", 1.0, 0.0, 1.0);
        totals.add("a", 5.0, 1.0, 2.0);
        totals.add("b", 2.0, 0.5, 1.0);

        assert_eq!(totals.labels(), vec!["b", "a"]);
        let b = totals.get("b").unwrap();
        assert_eq!((b.revenue, b.profit, b.quantity), (3.0, 0.5, 2.0));
        assert_eq!(totals.total_revenue(), 8.0);
    }

    #[test]
    fn ranked_by_is_stable_for_ties() {
        let mut totals = GroupTotals::new();
        totals.add("first", 50.0, 0.0, 0.0);
        totals.add("second", 50.0, 0.0, 0.0);
        totals.add("third", 70.0, 0.0, 0.0);

        let labels: Vec<String> = totals
            .ranked_by(|e| e.revenue)
            .into_iter()
            .map(|e| e.label)
            .collect();
        assert_eq!(labels, vec!["third", "first", "second"]);
    }

    #[test]
    fn sort_by_keeps_lookup_working() {
        let mut totals = GroupTotals::new();
        totals.add("2024-02", 2.0, 0.0, 0.0);
        totals.add("2024-01", 1.0, 0.0, 0.0);
        totals.sort_by(|a, b| a.label.cmp(&b.label));

        assert_eq!(totals.labels(), vec!["2024-01", "2024-02"]);
        assert_eq!(totals.get("2024-02").unwrap().revenue, 2.0);
    }

    #[test]
    fn group_totals_round_trip_as_array() {
        let mut totals = GroupTotals::new();
        totals.add("X", 300.0, 30.0, 3.0);
        let json = serde_json::to_value(&totals).unwrap();
        assert!(json.is_array());

        let back: GroupTotals = serde_json::from_value(json).unwrap();
        assert_eq!(back.get("X").unwrap().revenue, 300.0);
    }

    #[test]
    fn margin_bands() {
        assert_eq!(MarginBand::from_margin(30.0), MarginBand::Healthy);
        assert_eq!(MarginBand::from_margin(29.9), MarginBand::Normal);
        assert_eq!(MarginBand::from_margin(10.0), MarginBand::Normal);
        assert_eq!(MarginBand::from_margin(9.99), MarginBand::Thin);
        assert_eq!(MarginBand::from_margin(0.0), MarginBand::Thin);
        assert_eq!(MarginBand::from_margin(-0.1), MarginBand::Loss);
    }

    #[test]
    fn growth_marker_serializes_with_kind_tag() {
        let json = serde_json::to_string(&GrowthMarker::Up { percent: 12.5 }).unwrap();
        assert_eq!(json, r#"{"kind":"up","percent":12.5}"#);
    }

    #[test]
    fn series_uses_camel_case_keys() {
        let json = serde_json::to_value(DashboardSeries::default()).unwrap();
        for key in [
            "totalRevenue",
            "totalProfit",
            "totalQuantity",
            "byBrand",
            "byCategory",
            "byTimeBucket",
            "topByRevenue",
            "topByProfit",
            "scatterPoints",
        ] {
            assert!(json.get(key).is_some(), "missing {}", key);
        }
    }
}
