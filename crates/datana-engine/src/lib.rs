//! # datana-engine
//!
//! Row normalization and dashboard aggregation.
//!
//! This crate provides:
//! - Fuzzy column resolution ([`FieldResolver`])
//! - Row → record normalization with revenue back-fill
//! - The filter predicate and filter picker options
//! - Aggregation into a [`DashboardSeries`]
//! - A [`Dashboard`] session that holds the rows and recomputes per filter
//!
//! ## Example
//!
//! ```rust
//! use datana_core::{FilterSet, Row};
//! use datana_engine::Dashboard;
//!
//! let rows = vec![
//!     Row::new().with("Product", "A").with("Price", "1,000").with("Quantity", "2"),
//!     Row::new().with("Product", "B").with("Brand", "X").with("Revenue", 500.0),
//! ];
//! let dashboard = Dashboard::new(rows);
//! let series = dashboard.series(&FilterSet::new());
//!
//! assert_eq!(series.total_revenue, 2500.0);
//! assert_eq!(series.top_product.as_deref(), Some("A"));
//! ```

pub mod aggregate;
pub mod config;
pub mod filter;
pub mod normalize;
pub mod resolver;

pub use aggregate::aggregate;
pub use config::{BucketGranularity, BucketOrder, ConfigError, EngineConfig};
pub use filter::{filter_options, matches, parse_date, FilterOptions};
pub use normalize::{normalize, normalize_all};
pub use resolver::{parse_number, ColumnMapping, FieldResolver};

use datana_core::{DashboardSeries, FilterSet, NormalizedRecord, Row};

/// A loaded dataset with its engine settings.
///
/// Rows are kept as uploaded; every call to [`Dashboard::series`] runs the
/// whole pipeline again from them.
#[derive(Clone, Debug)]
pub struct Dashboard {
    rows: Vec<Row>,
    config: EngineConfig,
    resolver: FieldResolver,
}

impl Dashboard {
    pub fn new(rows: Vec<Row>) -> Self {
        Self::with_config(rows, EngineConfig::default())
    }

    pub fn with_config(rows: Vec<Row>, config: EngineConfig) -> Self {
        let resolver = config.resolver();
        tracing::debug!(rows = rows.len(), "loaded dashboard rows");
        Self {
            rows,
            config,
            resolver,
        }
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn resolver(&self) -> &FieldResolver {
        &self.resolver
    }

    /// Normalized records of every row, unfiltered
    pub fn records(&self) -> Vec<NormalizedRecord> {
        normalize_all(&self.rows, &self.resolver)
    }

    /// Aggregate the rows that pass `filters`
    pub fn series(&self, filters: &FilterSet) -> DashboardSeries {
        let records = filter::apply(self.records(), filters);
        aggregate(&records, &self.config)
    }

    /// Category and brand picker values over the unfiltered rows
    pub fn filter_options(&self) -> FilterOptions {
        filter_options(&self.records())
    }

    /// Column mapping detected from the first row's keys
    pub fn columns(&self) -> ColumnMapping {
        let headers = self.rows.first().map(|row| row.keys().collect::<Vec<_>>());
        self.resolver.detect_columns(headers.unwrap_or_default())
    }
}

/// One-shot pipeline: normalize, filter and aggregate
pub fn build_series(rows: &[Row], filters: &FilterSet, config: &EngineConfig) -> DashboardSeries {
    let records = normalize_all(rows, &config.resolver());
    aggregate(&filter::apply(records, filters), config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use datana_core::FieldKey;
    use pretty_assertions::assert_eq;

    fn rows() -> Vec<Row> {
        vec![
            Row::new()
                .with("Tên", "Laptop")
                .with("Thương hiệu", "Dell")
                .with("Danh mục", "Computer")
                .with("Doanh thu", "2,000")
                .with("Ngày", "2024-01-05"),
            Row::new()
                .with("Tên", "Phone")
                .with("Thương hiệu", "Apple")
                .with("Danh mục", "Mobile")
                .with("Doanh thu", "3,000")
                .with("Ngày", "2024-02-05"),
        ]
    }

    #[test]
    fn series_recomputes_per_filter() {
        let dashboard = Dashboard::new(rows());
        assert_eq!(dashboard.series(&FilterSet::new()).total_revenue, 5000.0);
        assert_eq!(
            dashboard.series(&FilterSet::new().brand("Apple")).total_revenue,
            3000.0
        );
        // rows are untouched by filtering
        assert_eq!(dashboard.rows().len(), 2);
        assert_eq!(dashboard.series(&FilterSet::new()).row_count, 2);
    }

    #[test]
    fn build_series_matches_session() {
        let filters = FilterSet::new().category("Computer");
        let config = EngineConfig::default();
        let session = Dashboard::with_config(rows(), config.clone()).series(&filters);
        assert_eq!(build_series(&rows(), &filters, &config), session);
    }

    #[test]
    fn columns_from_first_row() {
        let mapping = Dashboard::new(rows()).columns();
        assert_eq!(mapping.column(FieldKey::Revenue), Some("Doanh thu"));
        assert_eq!(mapping.column(FieldKey::Brand), Some("Thương hiệu"));
        assert_eq!(mapping.column(FieldKey::Price), None);
    }

    #[test]
    fn empty_dataset() {
        let dashboard = Dashboard::new(Vec::new());
        let series = dashboard.series(&FilterSet::new());
        assert!(series.is_empty());
        assert_eq!(dashboard.columns().missing(), FieldKey::ALL.to_vec());
        assert_eq!(dashboard.filter_options(), FilterOptions::default());
    }
}
