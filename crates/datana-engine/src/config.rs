//! Engine configuration
//!
//! Loaded from TOML; every key is optional.
//!
//! ```toml
//! unknown_brand = "Other"
//! top_brands = 5
//! bucket_order = "chronological"
//! bucket_granularity = "month"
//!
//! [synonyms]
//! category = ["type", "loại"]
//! date = ["ngày_bán"]
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use datana_core::FieldKey;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::resolver::FieldResolver;

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Unknown field in [synonyms]: {0}")]
    UnknownField(String),
}

/// How time buckets are ordered in the series
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BucketOrder {
    /// Plain string order; correct for ISO `YYYY-MM(-DD)` labels only
    #[default]
    Lexical,
    /// Parseable dates by date, everything else after them in string order
    Chronological,
}

/// What a time bucket key is made of
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BucketGranularity {
    /// The raw date text of the record
    #[default]
    Raw,
    /// `YYYY-MM` for parseable dates, raw text otherwise
    Month,
}

/// Aggregation settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Label for records without a product
    pub unknown_product: String,
    /// Label for records without a brand
    pub unknown_brand: String,
    /// Label for records without a category
    pub unknown_category: String,
    /// Length of the top revenue / top profit lists
    pub top_records: usize,
    /// Length of the detail table (records by revenue)
    pub detail_rows: usize,
    /// Number of brands in the brand ranking
    pub top_brands: usize,
    /// Number of products in the best seller table
    pub best_sellers: usize,
    pub bucket_order: BucketOrder,
    pub bucket_granularity: BucketGranularity,
    /// Extra column synonyms per field name
    pub synonyms: BTreeMap<String, Vec<String>>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            unknown_product: "Unknown".into(),
            unknown_brand: "Khác".into(),
            unknown_category: "Chung".into(),
            top_records: 10,
            detail_rows: 20,
            top_brands: 8,
            best_sellers: 5,
            bucket_order: BucketOrder::Lexical,
            bucket_granularity: BucketGranularity::Raw,
            synonyms: BTreeMap::new(),
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Set the bucket order (builder pattern)
    pub fn bucket_order(mut self, order: BucketOrder) -> Self {
        self.bucket_order = order;
        self
    }

    /// Set the bucket granularity (builder pattern)
    pub fn bucket_granularity(mut self, granularity: BucketGranularity) -> Self {
        self.bucket_granularity = granularity;
        self
    }

    /// Add extra synonyms for a field (builder pattern)
    pub fn synonyms<I, S>(mut self, key: FieldKey, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.synonyms
            .entry(key.as_str().to_string())
            .or_default()
            .extend(extra.into_iter().map(Into::into));
        self
    }

    /// Check that every `[synonyms]` key names a field
    pub fn validate(&self) -> Result<(), ConfigError> {
        for name in self.synonyms.keys() {
            name.parse::<FieldKey>()
                .map_err(|_| ConfigError::UnknownField(name.clone()))?;
        }
        Ok(())
    }

    /// Resolver with the built-in synonyms plus the configured ones
    pub fn resolver(&self) -> FieldResolver {
        let mut resolver = FieldResolver::new();
        for (name, extra) in &self.synonyms {
            match name.parse::<FieldKey>() {
                Ok(key) => resolver.add_synonyms(key, extra),
                Err(_) => tracing::warn!(field = %name, "ignoring synonyms for unknown field"),
            }
        }
        resolver
    }
}
