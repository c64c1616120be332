//! Plain-text dashboard report

use std::fmt::Write;

use datana_core::{DashboardSeries, GrowthMarker, RenderError, Renderer};

use crate::money::{format_money, format_number, format_percent};

/// Terminal report renderer
#[derive(Clone, Debug)]
pub struct TextRenderer {
    /// Include the full per-product table
    pub show_products: bool,
    /// Width of the label column
    pub label_width: usize,
}

impl Default for TextRenderer {
    fn default() -> Self {
        Self {
            show_products: true,
            label_width: 28,
        }
    }
}

impl TextRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Leave out the per-product table
    pub fn compact(mut self) -> Self {
        self.show_products = false;
        self
    }

    pub fn render_report(&self, series: &DashboardSeries) -> Result<String, RenderError> {
        let mut out = String::new();
        self.write_report(&mut out, series)
            .map_err(|e| RenderError::Format(e.to_string()))?;
        Ok(out)
    }

    fn write_report(&self, out: &mut String, series: &DashboardSeries) -> std::fmt::Result {
        heading(out, "Dashboard Summary", '=')?;
        if series.is_empty() {
            writeln!(out, "No rows.")?;
            return Ok(());
        }

        writeln!(out, "Rows:            {}", series.row_count)?;
        if series.unreadable_rows > 0 {
            writeln!(out, "Unreadable rows: {}", series.unreadable_rows)?;
        }
        writeln!(out, "Revenue:         {}", format_money(series.total_revenue))?;
        writeln!(out, "Profit:          {}", format_money(series.total_profit))?;
        writeln!(out, "Quantity:        {}", format_number(series.total_quantity))?;
        writeln!(out, "Average margin:  {}", format_percent(series.average_margin))?;
        writeln!(
            out,
            "Top product:     {}",
            series.top_product.as_deref().unwrap_or("-")
        )?;

        let w = self.label_width;

        writeln!(out)?;
        heading(out, "Brands", '-')?;
        for entry in &series.top_brands {
            writeln!(
                out,
                "{:<w$} {:>18} {:>18}",
                entry.label,
                format_money(entry.revenue),
                format_money(entry.profit),
            )?;
        }

        writeln!(out)?;
        heading(out, "Categories", '-')?;
        for entry in &series.top_categories {
            writeln!(
                out,
                "{:<w$} {:>8} {:>18} {:>18}",
                entry.label,
                format_number(entry.quantity),
                format_money(entry.revenue),
                format_money(entry.profit),
            )?;
        }

        writeln!(out)?;
        heading(out, "Best Sellers", '-')?;
        for stat in &series.best_sellers {
            writeln!(
                out,
                "{:<w$} {:>8} {:>18} {:>18}",
                stat.label,
                format_number(stat.quantity),
                format_money(stat.average_price),
                format_money(stat.profit),
            )?;
        }

        if self.show_products {
            writeln!(out)?;
            heading(out, "Products", '-')?;
            for stat in &series.product_stats {
                writeln!(
                    out,
                    "{:<w$} {:<16} {:>8} {:>18} {:>18} {:>8} {:?}",
                    stat.label,
                    stat.category,
                    format_number(stat.quantity),
                    format_money(stat.revenue),
                    format_money(stat.profit),
                    format_percent(stat.margin),
                    stat.margin_band,
                )?;
            }
        }

        if !series.monthly_growth.is_empty() {
            writeln!(out)?;
            heading(out, "Monthly Growth", '-')?;
            for point in &series.monthly_growth {
                writeln!(
                    out,
                    "{:<w$} {:>18} {:>18}  {}",
                    point.label,
                    format_money(point.revenue),
                    format_money(point.profit),
                    growth_label(&point.growth),
                )?;
            }
        }
        Ok(())
    }
}

impl Renderer for TextRenderer {
    type Output = String;

    fn render(&self, series: &DashboardSeries) -> Result<String, RenderError> {
        self.render_report(series)
    }
}

fn heading(out: &mut String, title: &str, underline: char) -> std::fmt::Result {
    writeln!(out, "{}", title)?;
    writeln!(out, "{}", underline.to_string().repeat(title.chars().count()))
}

/// Short marker for a growth point
pub fn growth_label(growth: &GrowthMarker) -> String {
    match growth {
        GrowthMarker::Start => "new".into(),
        GrowthMarker::Up { percent } => format!("▲ {}", format_percent(*percent)),
        GrowthMarker::Down { percent } => format!("▼ {}", format_percent(*percent)),
        GrowthMarker::Flat => "=".into(),
        GrowthMarker::NotComparable => "-".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn growth_labels() {
        assert_eq!(growth_label(&GrowthMarker::Start), "new");
        assert_eq!(growth_label(&GrowthMarker::Up { percent: 12.5 }), "▲ 12.5%");
        assert_eq!(growth_label(&GrowthMarker::Down { percent: 50.0 }), "▼ 50.0%");
        assert_eq!(growth_label(&GrowthMarker::NotComparable), "-");
    }

    #[test]
    fn empty_series() {
        let text = TextRenderer::new().render(&DashboardSeries::default()).unwrap();
        assert_eq!(text, "Dashboard Summary\n=================\nNo rows.\n");
    }

    #[test]
    fn unreadable_line_only_when_present() {
        let mut series = DashboardSeries {
            row_count: 2,
            total_revenue: 1500.0,
            ..Default::default()
        };
        let text = TextRenderer::new().render(&series).unwrap();
        assert!(text.contains("Revenue:         1.500 ₫"));
        assert!(!text.contains("Unreadable"));

        series.unreadable_rows = 1;
        let text = TextRenderer::new().render(&series).unwrap();
        assert!(text.contains("Unreadable rows: 1"));
        assert!(text.contains("Top product:     -"));
    }
}
