//! WebAssembly bindings for the datana dashboard engine
//!
//! The browser page uploads a sheet once, then asks for a new dashboard on
//! every filter change. [`DashboardSession`] keeps the rows between calls;
//! [`summarize`] is the one-shot form.
//!
//! Filters travel as JSON: `{"startDate": "2024-01-01", "endDate": "",
//! "categories": [], "brands": ["Apple"]}`. Every field may be omitted.

use serde::Serialize;
use wasm_bindgen::prelude::*;

use datana_core::{DashboardSeries, FilterSet, Renderer, Row};
use datana_engine::{Dashboard, EngineConfig};
use datana_render::{ChartRenderer, ChartSet, ExcelRenderer};

/// Initialize panic hook for better error messages in console
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Series and chart payloads for one filter selection
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DashboardView {
    series: DashboardSeries,
    charts: ChartSet,
}

/// Aggregate an uploaded sheet in one call and return the dashboard as JSON
#[wasm_bindgen]
pub fn summarize(rows_json: &str, filters_json: &str) -> Result<String, JsValue> {
    let session = DashboardSession::from_json_internal(rows_json, None).map_err(js_error)?;
    session.dashboard_internal(filters_json).map_err(js_error)
}

/// Loaded sheet kept across filter changes
#[wasm_bindgen]
pub struct DashboardSession {
    dashboard: Dashboard,
}

#[wasm_bindgen]
impl DashboardSession {
    /// Load rows from a JSON array or an upload envelope with `raw_data`
    #[wasm_bindgen(constructor)]
    pub fn new(rows_json: &str) -> Result<DashboardSession, JsValue> {
        Self::from_json_internal(rows_json, None).map_err(js_error)
    }

    /// Load rows from JSON with engine settings given as TOML
    #[wasm_bindgen(js_name = withConfig)]
    pub fn with_config(rows_json: &str, config_toml: &str) -> Result<DashboardSession, JsValue> {
        Self::from_json_internal(rows_json, Some(config_toml)).map_err(js_error)
    }

    /// Load rows from CSV text
    #[wasm_bindgen(js_name = fromCsv)]
    pub fn from_csv(csv: &str) -> Result<DashboardSession, JsValue> {
        let rows = datana_ingest::parse_csv(csv).map_err(|e| js_error(e.to_string()))?;
        Ok(Self::from_rows(rows, EngineConfig::default()))
    }

    /// Number of loaded rows
    #[wasm_bindgen(js_name = rowCount)]
    pub fn row_count(&self) -> usize {
        self.dashboard.rows().len()
    }

    /// Series and chart payloads as a JSON string
    pub fn dashboard(&self, filters_json: &str) -> Result<String, JsValue> {
        self.dashboard_internal(filters_json).map_err(js_error)
    }

    /// Aggregated series as a JSON string
    pub fn summary(&self, filters_json: &str) -> Result<String, JsValue> {
        self.summary_internal(filters_json).map_err(js_error)
    }

    /// Chart card payloads as a JSON string
    pub fn charts(&self, filters_json: &str) -> Result<String, JsValue> {
        self.charts_internal(filters_json).map_err(js_error)
    }

    /// Aggregated series as a JS object; takes the filters as a JS object too
    #[wasm_bindgen(js_name = summaryValue)]
    pub fn summary_value(&self, filters: JsValue) -> Result<JsValue, JsValue> {
        let filters: FilterSet = if filters.is_undefined() || filters.is_null() {
            FilterSet::default()
        } else {
            serde_wasm_bindgen::from_value(filters)
                .map_err(|e| js_error(format!("Invalid filters: {e}")))?
        };
        let series = self.dashboard.series(&filters);
        serde_wasm_bindgen::to_value(&series).map_err(|e| js_error(e.to_string()))
    }

    /// Category and brand picker values as a JSON string
    #[wasm_bindgen(js_name = filterOptions)]
    pub fn filter_options(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.dashboard.filter_options())
            .map_err(|e| js_error(format!("JSON error: {e}")))
    }

    /// Detected column per field as a JSON string
    pub fn columns(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.dashboard.columns())
            .map_err(|e| js_error(format!("JSON error: {e}")))
    }

    /// Excel workbook bytes for the filtered rows
    #[wasm_bindgen(js_name = renderXlsx)]
    pub fn render_xlsx(&self, filters_json: &str) -> Result<Vec<u8>, JsValue> {
        let series = self.series_internal(filters_json).map_err(js_error)?;
        ExcelRenderer::new()
            .render(&series)
            .map_err(|e| js_error(e.to_string()))
    }
}

impl DashboardSession {
    fn from_rows(rows: Vec<Row>, config: EngineConfig) -> Self {
        Self {
            dashboard: Dashboard::with_config(rows, config),
        }
    }

    fn from_json_internal(rows_json: &str, config_toml: Option<&str>) -> Result<Self, String> {
        let rows = datana_ingest::parse_json(rows_json).map_err(|e| e.to_string())?;
        let config = match config_toml {
            Some(toml) => EngineConfig::from_toml_str(toml).map_err(|e| e.to_string())?,
            None => EngineConfig::default(),
        };
        Ok(Self::from_rows(rows, config))
    }

    fn series_internal(&self, filters_json: &str) -> Result<DashboardSeries, String> {
        let filters = parse_filters(filters_json)?;
        Ok(self.dashboard.series(&filters))
    }

    fn summary_internal(&self, filters_json: &str) -> Result<String, String> {
        let series = self.series_internal(filters_json)?;
        serde_json::to_string(&series).map_err(|e| format!("JSON serialization error: {e}"))
    }

    fn charts_internal(&self, filters_json: &str) -> Result<String, String> {
        let series = self.series_internal(filters_json)?;
        serde_json::to_string(&ChartRenderer::new().build(&series))
            .map_err(|e| format!("JSON serialization error: {e}"))
    }

    fn dashboard_internal(&self, filters_json: &str) -> Result<String, String> {
        let series = self.series_internal(filters_json)?;
        let charts = ChartRenderer::new().build(&series);
        serde_json::to_string(&DashboardView { series, charts })
            .map_err(|e| format!("JSON serialization error: {e}"))
    }
}

/// Blank input means no filters
fn parse_filters(filters_json: &str) -> Result<FilterSet, String> {
    if filters_json.trim().is_empty() {
        return Ok(FilterSet::default());
    }
    serde_json::from_str(filters_json).map_err(|e| format!("Invalid filters: {e}"))
}

fn js_error(message: impl AsRef<str>) -> JsValue {
    JsValue::from_str(message.as_ref())
}
