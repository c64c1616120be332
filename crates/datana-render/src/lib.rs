//! # datana-render
//!
//! Rendering backends for datana dashboards.
//!
//! This crate provides:
//! - Chart card payloads for the six dashboard charts
//! - Plain-text summary reports
//! - Excel workbooks with one sheet per dashboard table
//! - vi-VN money and number formatting
//!
//! ## Example
//!
//! ```rust,ignore
//! use datana_core::Renderer;
//! use datana_render::{ChartRenderer, ExcelRenderer, TextRenderer};
//!
//! let charts = ChartRenderer::new().render(&series)?;
//! let report = TextRenderer::new().compact().render(&series)?;
//!
//! let xlsx_bytes = ExcelRenderer::new().render(&series)?;
//! std::fs::write("dashboard.xlsx", xlsx_bytes)?;
//! ```

pub mod charts;
pub mod excel;
pub mod money;
pub mod text;

pub use charts::{
    hex_to_rgba, CardId, ChartCard, ChartKind, ChartRenderer, ChartSet, Gradient,
    CATEGORY_PALETTE,
};
pub use excel::ExcelRenderer;
pub use money::{format_compact, format_money, format_number, format_percent};
pub use text::{growth_label, TextRenderer};
