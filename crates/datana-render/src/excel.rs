//! Excel dashboard report
//!
//! One workbook, one sheet per dashboard table:
//! - Summary: totals, average margin, top product
//! - Brands / Categories: revenue, profit, quantity per group
//! - Products: per-product stats with margin band coloring
//! - Monthly Growth: time buckets with month-over-month change
//! - Top Revenue: the highest-revenue records
//!
//! ## Example Output Structure
//!
//! ```text
//! Sheet: Brands
//! | Brand   | Revenue ₫  | Profit ₫ | Quantity |
//! |---------|------------|----------|----------|
//! | Apple   | 900        | 90       | 12       |
//! | Khác    | 300        | -20      | 3        |
//! ```

use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, Workbook, Worksheet, XlsxError};

use datana_core::{DashboardSeries, GroupEntry, GrowthMarker, MarginBand, RenderError, Renderer};

use crate::money::DONG;

/// Excel report renderer
#[derive(Clone, Debug)]
pub struct ExcelRenderer {
    /// Currency symbol in number formats and headers
    pub currency: String,
    /// Whether to include the Products sheet
    pub include_products: bool,
    /// Whether to include the Top Revenue sheet
    pub include_top_revenue: bool,
}

impl Default for ExcelRenderer {
    fn default() -> Self {
        Self {
            currency: DONG.into(),
            include_products: true,
            include_top_revenue: true,
        }
    }
}

struct ExcelFormats {
    header: Format,
    currency: Format,
    number: Format,
    percent: Format,
    text: Format,
    label: Format,
    total_row: Format,
    total_currency: Format,
    healthy: Format,
    thin: Format,
    loss: Format,
}

impl ExcelRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set currency symbol
    pub fn currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    /// Leave out the Products sheet
    pub fn no_products(mut self) -> Self {
        self.include_products = false;
        self
    }

    /// Leave out the Top Revenue sheet
    pub fn no_top_revenue(mut self) -> Self {
        self.include_top_revenue = false;
        self
    }

    /// Generate Excel workbook bytes
    pub fn render_to_bytes(&self, series: &DashboardSeries) -> Result<Vec<u8>, RenderError> {
        let mut workbook = Workbook::new();
        let formats = self.create_formats();

        self.add_summary_sheet(&mut workbook, series, &formats)?;
        self.add_group_sheet(&mut workbook, "Brands", "Brand", &all_brands(series), &formats)?;
        self.add_group_sheet(&mut workbook, "Categories", "Category", &series.top_categories, &formats)?;
        if self.include_products {
            self.add_products_sheet(&mut workbook, series, &formats)?;
        }
        self.add_growth_sheet(&mut workbook, series, &formats)?;
        if self.include_top_revenue {
            self.add_top_revenue_sheet(&mut workbook, series, &formats)?;
        }

        let buffer = workbook
            .save_to_buffer()
            .map_err(|e| RenderError::Format(format!("Failed to create Excel: {e}")))?;
        tracing::debug!(bytes = buffer.len(), "rendered Excel report");
        Ok(buffer)
    }

    fn create_formats(&self) -> ExcelFormats {
        let money_format = format!("#,##0 \"{}\"", self.currency);

        let header = Format::new()
            .set_bold()
            .set_align(FormatAlign::Center)
            .set_background_color(0x4472C4)
            .set_font_color(0xFFFFFF)
            .set_border(FormatBorder::Thin);

        let currency = Format::new()
            .set_num_format(&money_format)
            .set_border(FormatBorder::Thin);

        let number = Format::new()
            .set_num_format("#,##0.###")
            .set_border(FormatBorder::Thin);

        let percent = Format::new()
            .set_num_format("0.0\"%\"")
            .set_border(FormatBorder::Thin);

        let text = Format::new().set_border(FormatBorder::Thin);

        let label = Format::new().set_bold().set_border(FormatBorder::Thin);

        let total_row = Format::new()
            .set_bold()
            .set_background_color(0xE2EFDA)
            .set_border(FormatBorder::Thin);

        let total_currency = Format::new()
            .set_bold()
            .set_num_format(&money_format)
            .set_background_color(0xE2EFDA)
            .set_border(FormatBorder::Thin);

        // Margin bands, same colors as the dashboard table
        let healthy = Format::new()
            .set_bold()
            .set_num_format("0.0\"%\"")
            .set_font_color(0x10B981)
            .set_border(FormatBorder::Thin);
        let thin = Format::new()
            .set_bold()
            .set_num_format("0.0\"%\"")
            .set_font_color(0xF59E0B)
            .set_border(FormatBorder::Thin);
        let loss = Format::new()
            .set_bold()
            .set_num_format("0.0\"%\"")
            .set_font_color(0xEF4444)
            .set_border(FormatBorder::Thin);

        ExcelFormats {
            header,
            currency,
            number,
            percent,
            text,
            label,
            total_row,
            total_currency,
            healthy,
            thin,
            loss,
        }
    }

    fn add_summary_sheet(
        &self,
        workbook: &mut Workbook,
        series: &DashboardSeries,
        formats: &ExcelFormats,
    ) -> Result<(), RenderError> {
        let sheet = named_sheet(workbook, "Summary")?;
        write_headers(sheet, &["Metric", "Value"], formats)?;
        sheet.set_column_width(0, 20).ok();
        sheet.set_column_width(1, 24).ok();

        let rows: [(&str, f64, &Format); 6] = [
            ("Rows", series.row_count as f64, &formats.number),
            ("Unreadable rows", series.unreadable_rows as f64, &formats.number),
            ("Revenue", series.total_revenue, &formats.currency),
            ("Profit", series.total_profit, &formats.currency),
            ("Quantity", series.total_quantity, &formats.number),
            ("Average margin", series.average_margin, &formats.percent),
        ];
        let mut row = 1u32;
        for (name, value, format) in rows {
            sheet
                .write_with_format(row, 0, name, &formats.label)
                .map_err(xlsx_error)?;
            sheet
                .write_with_format(row, 1, value, format)
                .map_err(xlsx_error)?;
            row += 1;
        }

        sheet
            .write_with_format(row, 0, "Top product", &formats.label)
            .map_err(xlsx_error)?;
        sheet
            .write_with_format(row, 1, series.top_product.as_deref().unwrap_or("-"), &formats.text)
            .map_err(xlsx_error)?;
        Ok(())
    }

    fn add_group_sheet(
        &self,
        workbook: &mut Workbook,
        name: &str,
        label_header: &str,
        entries: &[GroupEntry],
        formats: &ExcelFormats,
    ) -> Result<(), RenderError> {
        let sheet = named_sheet(workbook, name)?;
        let revenue = format!("Revenue {}", self.currency);
        let profit = format!("Profit {}", self.currency);
        write_headers(sheet, &[label_header, &revenue, &profit, "Quantity"], formats)?;
        sheet.set_column_width(0, 30).ok();
        sheet.set_column_width(1, 18).ok();
        sheet.set_column_width(2, 18).ok();
        sheet.set_column_width(3, 12).ok();

        let mut row = 1u32;
        for entry in entries {
            sheet
                .write_with_format(row, 0, entry.label.as_str(), &formats.text)
                .map_err(xlsx_error)?;
            sheet
                .write_with_format(row, 1, entry.revenue, &formats.currency)
                .map_err(xlsx_error)?;
            sheet
                .write_with_format(row, 2, entry.profit, &formats.currency)
                .map_err(xlsx_error)?;
            sheet
                .write_with_format(row, 3, entry.quantity, &formats.number)
                .map_err(xlsx_error)?;
            row += 1;
        }

        self.write_totals(sheet, row, 1, 3, formats)
    }

    fn add_products_sheet(
        &self,
        workbook: &mut Workbook,
        series: &DashboardSeries,
        formats: &ExcelFormats,
    ) -> Result<(), RenderError> {
        let sheet = named_sheet(workbook, "Products")?;
        let revenue = format!("Revenue {}", self.currency);
        let profit = format!("Profit {}", self.currency);
        let average = format!("Avg price {}", self.currency);
        write_headers(
            sheet,
            &["Product", "Category", "Quantity", &revenue, &profit, "Margin", &average],
            formats,
        )?;
        sheet.set_column_width(0, 34).ok();
        sheet.set_column_width(1, 18).ok();
        sheet.set_column_width(2, 10).ok();
        sheet.set_column_width(3, 18).ok();
        sheet.set_column_width(4, 18).ok();
        sheet.set_column_width(5, 9).ok();
        sheet.set_column_width(6, 16).ok();

        let mut row = 1u32;
        for stat in &series.product_stats {
            let margin_format = match stat.margin_band {
                MarginBand::Healthy => &formats.healthy,
                MarginBand::Thin => &formats.thin,
                MarginBand::Loss => &formats.loss,
                MarginBand::Normal => &formats.percent,
            };
            sheet
                .write_with_format(row, 0, stat.label.as_str(), &formats.text)
                .map_err(xlsx_error)?;
            sheet
                .write_with_format(row, 1, stat.category.as_str(), &formats.text)
                .map_err(xlsx_error)?;
            sheet
                .write_with_format(row, 2, stat.quantity, &formats.number)
                .map_err(xlsx_error)?;
            sheet
                .write_with_format(row, 3, stat.revenue, &formats.currency)
                .map_err(xlsx_error)?;
            sheet
                .write_with_format(row, 4, stat.profit, &formats.currency)
                .map_err(xlsx_error)?;
            sheet
                .write_with_format(row, 5, stat.margin, margin_format)
                .map_err(xlsx_error)?;
            sheet
                .write_with_format(row, 6, stat.average_price, &formats.currency)
                .map_err(xlsx_error)?;
            row += 1;
        }
        Ok(())
    }

    fn add_growth_sheet(
        &self,
        workbook: &mut Workbook,
        series: &DashboardSeries,
        formats: &ExcelFormats,
    ) -> Result<(), RenderError> {
        let sheet = named_sheet(workbook, "Monthly Growth")?;
        let revenue = format!("Revenue {}", self.currency);
        let profit = format!("Profit {}", self.currency);
        write_headers(sheet, &["Period", &revenue, &profit, "Quantity", "Growth"], formats)?;
        sheet.set_column_width(0, 16).ok();
        sheet.set_column_width(1, 18).ok();
        sheet.set_column_width(2, 18).ok();
        sheet.set_column_width(3, 12).ok();
        sheet.set_column_width(4, 12).ok();

        let mut row = 1u32;
        for point in &series.monthly_growth {
            sheet
                .write_with_format(row, 0, point.label.as_str(), &formats.text)
                .map_err(xlsx_error)?;
            sheet
                .write_with_format(row, 1, point.revenue, &formats.currency)
                .map_err(xlsx_error)?;
            sheet
                .write_with_format(row, 2, point.profit, &formats.currency)
                .map_err(xlsx_error)?;
            sheet
                .write_with_format(row, 3, point.quantity, &formats.number)
                .map_err(xlsx_error)?;
            match point.growth {
                GrowthMarker::Up { percent } => sheet
                    .write_with_format(row, 4, percent, &formats.healthy)
                    .map_err(xlsx_error)?,
                GrowthMarker::Down { percent } => sheet
                    .write_with_format(row, 4, -percent, &formats.loss)
                    .map_err(xlsx_error)?,
                GrowthMarker::Start => sheet
                    .write_with_format(row, 4, "new", &formats.text)
                    .map_err(xlsx_error)?,
                GrowthMarker::Flat => sheet
                    .write_with_format(row, 4, 0.0, &formats.percent)
                    .map_err(xlsx_error)?,
                GrowthMarker::NotComparable => sheet
                    .write_with_format(row, 4, "-", &formats.text)
                    .map_err(xlsx_error)?,
            };
            row += 1;
        }
        Ok(())
    }

    fn add_top_revenue_sheet(
        &self,
        workbook: &mut Workbook,
        series: &DashboardSeries,
        formats: &ExcelFormats,
    ) -> Result<(), RenderError> {
        let sheet = named_sheet(workbook, "Top Revenue")?;
        let price = format!("Price {}", self.currency);
        let revenue = format!("Revenue {}", self.currency);
        let profit = format!("Profit {}", self.currency);
        write_headers(
            sheet,
            &["Product", "Brand", "Category", &price, "Quantity", &revenue, &profit],
            formats,
        )?;
        sheet.set_column_width(0, 34).ok();
        sheet.set_column_width(1, 16).ok();
        sheet.set_column_width(2, 16).ok();
        for col in 3..=6 {
            sheet.set_column_width(col, 16).ok();
        }

        let mut row = 1u32;
        for record in &series.detail_rows {
            sheet
                .write_with_format(row, 0, record.label.as_str(), &formats.text)
                .map_err(xlsx_error)?;
            sheet
                .write_with_format(row, 1, record.brand.as_str(), &formats.text)
                .map_err(xlsx_error)?;
            sheet
                .write_with_format(row, 2, record.category.as_str(), &formats.text)
                .map_err(xlsx_error)?;
            sheet
                .write_with_format(row, 3, record.price, &formats.currency)
                .map_err(xlsx_error)?;
            sheet
                .write_with_format(row, 4, record.quantity, &formats.number)
                .map_err(xlsx_error)?;
            sheet
                .write_with_format(row, 5, record.revenue, &formats.currency)
                .map_err(xlsx_error)?;
            sheet
                .write_with_format(row, 6, record.profit, &formats.currency)
                .map_err(xlsx_error)?;
            row += 1;
        }
        Ok(())
    }

    /// TOTAL row with SUM formulas over columns `first..=last`
    fn write_totals(
        &self,
        sheet: &mut Worksheet,
        row: u32,
        first: u16,
        last: u16,
        formats: &ExcelFormats,
    ) -> Result<(), RenderError> {
        sheet
            .write_with_format(row, 0, "TOTAL", &formats.total_row)
            .map_err(xlsx_error)?;
        for col in first..=last {
            let letter = column_letter(col);
            let formula = if row > 1 {
                format!("=SUM({letter}2:{letter}{row})")
            } else {
                "=0".to_string()
            };
            let format = if col == last {
                &formats.total_row
            } else {
                &formats.total_currency
            };
            sheet
                .write_formula_with_format(row, col, formula.as_str(), format)
                .map_err(xlsx_error)?;
        }
        Ok(())
    }
}

impl Renderer for ExcelRenderer {
    type Output = Vec<u8>;

    fn render(&self, series: &DashboardSeries) -> Result<Vec<u8>, RenderError> {
        if series.is_empty() {
            return Err(RenderError::InvalidData("No rows to render".into()));
        }
        self.render_to_bytes(series)
    }
}

/// Every brand by revenue, not just the charted top ones
fn all_brands(series: &DashboardSeries) -> Vec<GroupEntry> {
    series.by_brand.ranked_by(|e| e.revenue)
}

fn named_sheet<'w>(workbook: &'w mut Workbook, name: &str) -> Result<&'w mut Worksheet, RenderError> {
    let sheet = workbook.add_worksheet();
    sheet.set_name(name).map_err(xlsx_error)?;
    Ok(sheet)
}

fn write_headers(sheet: &mut Worksheet, headers: &[&str], formats: &ExcelFormats) -> Result<(), RenderError> {
    for (col, header) in headers.iter().enumerate() {
        sheet
            .write_with_format(0, col as u16, *header, &formats.header)
            .map_err(xlsx_error)?;
    }
    Ok(())
}

fn xlsx_error(e: XlsxError) -> RenderError {
    RenderError::Format(e.to_string())
}

/// Spreadsheet column name for a zero-based index (A, B, ..., Z, AA, ...)
fn column_letter(col: u16) -> String {
    let mut n = u32::from(col) + 1;
    let mut name = Vec::new();
    while n > 0 {
        let rem = ((n - 1) % 26) as u8;
        name.push(b'A' + rem);
        n = (n - 1) / 26;
    }
    name.reverse();
    String::from_utf8_lossy(&name).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn series() -> DashboardSeries {
        let mut series = DashboardSeries {
            row_count: 2,
            total_revenue: 300.0,
            ..Default::default()
        };
        series.by_brand.add("Apple", 200.0, 20.0, 2.0);
        series.by_brand.add("Khác", 100.0, -5.0, 1.0);
        series
    }

    #[test]
    fn column_letters() {
        assert_eq!(column_letter(0), "A");
        assert_eq!(column_letter(3), "D");
        assert_eq!(column_letter(25), "Z");
        assert_eq!(column_letter(26), "AA");
        assert_eq!(column_letter(27), "AB");
    }

    #[test]
    fn renders_zip_container() {
        let bytes = ExcelRenderer::new().render(&series()).unwrap();
        assert!(bytes.len() > 100);
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn empty_series_is_rejected() {
        let err = ExcelRenderer::new()
            .render(&DashboardSeries::default())
            .unwrap_err();
        assert!(matches!(err, RenderError::InvalidData(_)));
    }

    #[test]
    fn optional_sheets_can_be_skipped() {
        let renderer = ExcelRenderer::new().no_products().no_top_revenue().currency("VND");
        assert!(!renderer.include_products);
        assert!(!renderer.include_top_revenue);
        assert!(renderer.render_to_bytes(&series()).is_ok());
    }

    #[test]
    fn brand_sheet_lists_every_brand() {
        let mut series = series();
        series.by_brand.add("Dell", 500.0, 0.0, 1.0);
        let labels: Vec<String> = all_brands(&series).into_iter().map(|e| e.label).collect();
        assert_eq!(labels, vec!["Dell", "Apple", "Khác"]);
    }
}
