//! Chart payloads for the dashboard cards
//!
//! The engine does not draw; it tells an external charting layer what each
//! card shows. A card without enough data is still emitted, with
//! `visible: false`, so the page can hide it.

use datana_core::{DashboardSeries, RenderError, Renderer, ScatterPoint};
use serde::Serialize;

/// Colors of the category doughnut slices, in order
pub const CATEGORY_PALETTE: [&str; 6] = [
    "#8b5cf6", "#ec4899", "#06b6d4", "#10b981", "#f59e0b", "#f472b6",
];

const TOP_REVENUE_COLOR: &str = "#8b5cf6";
const BRAND_COLOR: &str = "#0ea5e9";
const TREND_COLOR: &str = "#10b981";
const TOP_PROFIT_COLOR: &str = "#10b981";
const BUBBLE_COLOR: &str = "#ec4899";

/// Per-brand bubble colors, cycled when there are more brands
pub const BRAND_PALETTE: [&str; 10] = [
    "#8b5cf6", "#10b981", "#f43f5e", "#3b82f6", "#f59e0b", "#ec4899", "#6366f1", "#14b8a6",
    "#84cc16", "#d946ef",
];

const BRAND_BUBBLE_BORDER: &str = "#1e293b";
const REVENUE_BAR_COLOR: &str = "#3b82f6";
const PROFIT_LINE_COLOR: &str = "#f472b6";

/// Largest brand bubble radius; the brand with the most units gets it
const BRAND_BUBBLE_MAX_RADIUS: f64 = 35.0;
const BRAND_BUBBLE_MIN_RADIUS: f64 = 6.0;

/// Dashboard card identifiers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CardId {
    TopRevenue,
    Brands,
    Trend,
    Categories,
    Scatter,
    TopProfit,
    BrandBubble,
    RevenueProfit,
    TopProducts,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    Line,
    Doughnut,
    Bubble,
    /// Bars on the left axis with a line on the right axis
    DualAxis,
}

/// Vertical fill gradient, top to bottom
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Gradient {
    pub from: String,
    pub to: String,
}

impl Gradient {
    pub fn from_hex(color: &str, alpha: f64) -> Self {
        Self {
            from: hex_to_rgba(color, alpha),
            to: hex_to_rgba(color, 0.05),
        }
    }
}

/// One dashboard card
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartCard {
    pub id: CardId,
    pub kind: ChartKind,
    /// Bars run along the y axis (long product names)
    pub horizontal: bool,
    pub visible: bool,
    pub labels: Vec<String>,
    pub values: Vec<f64>,
    /// Right-axis line of a dual-axis card, aligned with `labels`
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub secondary: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_color: Option<String>,
    /// Bubble charts only
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub points: Vec<ScatterPoint>,
    /// Border / line color; doughnuts use `palette` instead
    pub color: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub palette: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill: Option<Gradient>,
}

impl ChartCard {
    fn new(id: CardId, kind: ChartKind, color: &str) -> Self {
        Self {
            id,
            kind,
            horizontal: false,
            visible: false,
            labels: Vec::new(),
            values: Vec::new(),
            secondary: Vec::new(),
            secondary_color: None,
            points: Vec::new(),
            color: color.to_string(),
            palette: Vec::new(),
            fill: None,
        }
    }

    fn horizontal(mut self) -> Self {
        self.horizontal = true;
        self
    }

    fn fill(mut self, alpha: f64) -> Self {
        self.fill = Some(Gradient::from_hex(&self.color, alpha));
        self
    }

    fn series(mut self, labels: Vec<String>, values: Vec<f64>) -> Self {
        self.visible = !labels.is_empty() && !values.is_empty();
        self.labels = labels;
        self.values = values;
        self
    }
}

/// All cards of one dashboard
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ChartSet {
    pub cards: Vec<ChartCard>,
}

impl ChartSet {
    pub fn card(&self, id: CardId) -> Option<&ChartCard> {
        self.cards.iter().find(|c| c.id == id)
    }

    pub fn visible(&self) -> impl Iterator<Item = &ChartCard> {
        self.cards.iter().filter(|c| c.visible)
    }
}

/// Builds the chart payloads from a series
#[derive(Clone, Debug)]
pub struct ChartRenderer {
    /// Bars in the top revenue / top profit cards
    pub top_records: usize,
    /// Bars in the brand card
    pub top_brands: usize,
    /// Fewest time buckets for the trend line
    pub min_trend_buckets: usize,
    /// Fewest points for the bubble chart
    pub min_scatter_points: usize,
    /// Most points drawn in the bubble chart
    pub max_scatter_points: usize,
    /// Slices in the top products doughnut
    pub top_products: usize,
}

impl Default for ChartRenderer {
    fn default() -> Self {
        Self {
            top_records: 10,
            top_brands: 8,
            min_trend_buckets: 2,
            min_scatter_points: 3,
            max_scatter_points: 60,
            top_products: 5,
        }
    }
}

impl ChartRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of bars in the top lists
    pub fn top_records(mut self, n: usize) -> Self {
        self.top_records = n;
        self
    }

    /// Set the most bubbles drawn
    pub fn max_scatter_points(mut self, n: usize) -> Self {
        self.max_scatter_points = n;
        self
    }

    pub fn build(&self, series: &DashboardSeries) -> ChartSet {
        let top_revenue = series.top_by_revenue.iter().take(self.top_records);
        let top_profit = series.top_by_profit.iter().take(self.top_records);
        let brands = series.top_brands.iter().take(self.top_brands);
        let buckets = series.by_time_bucket.entries();

        let mut trend = ChartCard::new(CardId::Trend, ChartKind::Line, TREND_COLOR)
            .fill(0.25)
            .series(
                buckets.iter().map(|e| e.label.clone()).collect(),
                buckets.iter().map(|e| e.revenue).collect(),
            );
        trend.visible = buckets.len() >= self.min_trend_buckets;

        let categories_by_revenue = &series.top_categories;
        let mut categories =
            ChartCard::new(CardId::Categories, ChartKind::Doughnut, CATEGORY_PALETTE[0]).series(
                categories_by_revenue.iter().map(|e| e.label.clone()).collect(),
                categories_by_revenue.iter().map(|e| e.revenue).collect(),
            );
        categories.palette = CATEGORY_PALETTE.iter().map(|c| c.to_string()).collect();

        let mut scatter = ChartCard::new(CardId::Scatter, ChartKind::Bubble, BUBBLE_COLOR);
        scatter.fill = Some(Gradient {
            from: hex_to_rgba(BUBBLE_COLOR, 0.6),
            to: hex_to_rgba(BUBBLE_COLOR, 0.6),
        });
        scatter.visible = series.scatter_points.len() >= self.min_scatter_points;
        scatter.points = series
            .scatter_points
            .iter()
            .take(self.max_scatter_points)
            .cloned()
            .collect();

        let cards = vec![
            ChartCard::new(CardId::TopRevenue, ChartKind::Bar, TOP_REVENUE_COLOR)
                .horizontal()
                .fill(0.6)
                .series(
                    top_revenue.clone().map(|r| r.label.clone()).collect(),
                    top_revenue.map(|r| r.revenue).collect(),
                ),
            ChartCard::new(CardId::Brands, ChartKind::Bar, BRAND_COLOR)
                .horizontal()
                .fill(0.6)
                .series(
                    brands.clone().map(|e| e.label.clone()).collect(),
                    brands.map(|e| e.revenue).collect(),
                ),
            trend,
            categories,
            scatter,
            ChartCard::new(CardId::TopProfit, ChartKind::Bar, TOP_PROFIT_COLOR)
                .horizontal()
                .fill(0.6)
                .series(
                    top_profit.clone().map(|r| r.label.clone()).collect(),
                    top_profit.map(|r| r.profit).collect(),
                ),
            brand_bubbles(series),
            revenue_profit(series),
            self.top_products_card(series),
        ];

        tracing::debug!(
            visible = cards.iter().filter(|c| c.visible).count(),
            "built chart payloads"
        );
        ChartSet { cards }
    }
}

impl ChartRenderer {
    fn top_products_card(&self, series: &DashboardSeries) -> ChartCard {
        let top = series.product_stats.iter().take(self.top_products);
        let mut card = ChartCard::new(CardId::TopProducts, ChartKind::Doughnut, BRAND_PALETTE[0])
            .series(
                top.clone().map(|p| p.label.clone()).collect(),
                top.map(|p| p.revenue).collect(),
            );
        card.palette = BRAND_PALETTE.iter().map(|c| c.to_string()).collect();
        card
    }
}

/// One bubble per brand: revenue on x, profit on y, radius by units sold
fn brand_bubbles(series: &DashboardSeries) -> ChartCard {
    let brands = series.by_brand.entries();
    let max_quantity = brands.iter().map(|e| e.quantity).fold(1.0, f64::max);

    let mut card = ChartCard::new(CardId::BrandBubble, ChartKind::Bubble, BRAND_BUBBLE_BORDER);
    card.visible = !brands.is_empty();
    card.points = brands
        .iter()
        .map(|e| ScatterPoint {
            x: e.revenue,
            y: e.profit,
            r: (e.quantity / max_quantity * BRAND_BUBBLE_MAX_RADIUS).max(BRAND_BUBBLE_MIN_RADIUS),
            label: e.label.clone(),
        })
        .collect();
    card.palette = (0..brands.len())
        .map(|i| hex_to_rgba(BRAND_PALETTE[i % BRAND_PALETTE.len()], 0.7))
        .collect();
    card
}

/// Revenue bars and profit line per time bucket
fn revenue_profit(series: &DashboardSeries) -> ChartCard {
    let buckets = series.by_time_bucket.entries();
    let mut card = ChartCard::new(CardId::RevenueProfit, ChartKind::DualAxis, REVENUE_BAR_COLOR)
        .fill(0.7)
        .series(
            buckets.iter().map(|e| e.label.clone()).collect(),
            buckets.iter().map(|e| e.revenue).collect(),
        );
    card.secondary = buckets.iter().map(|e| e.profit).collect();
    card.secondary_color = Some(PROFIT_LINE_COLOR.to_string());
    card
}

impl Renderer for ChartRenderer {
    type Output = ChartSet;

    fn render(&self, series: &DashboardSeries) -> Result<ChartSet, RenderError> {
        Ok(self.build(series))
    }
}

/// `#rrggbb` or `#rgb` to a CSS `rgba(...)`; unparseable colors are black
pub fn hex_to_rgba(hex: &str, alpha: f64) -> String {
    let digits = hex.trim_start_matches('#');
    let expanded: String = if digits.len() == 3 {
        digits.chars().flat_map(|c| [c, c]).collect()
    } else {
        digits.to_string()
    };
    let rgb = u32::from_str_radix(&expanded, 16).unwrap_or(0);
    format!(
        "rgba({}, {}, {}, {})",
        (rgb >> 16) & 255,
        (rgb >> 8) & 255,
        rgb & 255,
        alpha
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use datana_core::{GroupEntry, MarginBand, ProductStat, RankedRecord};
    use pretty_assertions::assert_eq;

    fn ranked(label: &str, revenue: f64) -> RankedRecord {
        RankedRecord {
            label: label.into(),
            revenue,
            profit: revenue / 10.0,
            ..Default::default()
        }
    }

    fn point(n: f64) -> ScatterPoint {
        ScatterPoint {
            x: n,
            y: n,
            r: 3.0,
            label: format!("P{}", n),
        }
    }

    #[test]
    fn hex_colors() {
        assert_eq!(hex_to_rgba("#8b5cf6", 0.6), "rgba(139, 92, 246, 0.6)");
        assert_eq!(hex_to_rgba("#fff", 0.05), "rgba(255, 255, 255, 0.05)");
        assert_eq!(hex_to_rgba("nope", 1.0), "rgba(0, 0, 0, 1)");
    }

    #[test]
    fn empty_series_hides_every_card() {
        let charts = ChartRenderer::new().build(&DashboardSeries::default());
        assert_eq!(charts.cards.len(), 9);
        assert_eq!(charts.visible().count(), 0);
    }

    #[test]
    fn brand_bubbles_scale_radius_by_quantity() {
        let mut series = DashboardSeries::default();
        series.by_brand.add("Apple", 900.0, 90.0, 70.0);
        series.by_brand.add("Sony", 300.0, -20.0, 35.0);
        series.by_brand.add("Nokia", 50.0, 5.0, 1.0);

        let charts = ChartRenderer::new().build(&series);
        let card = charts.card(CardId::BrandBubble).unwrap();
        assert!(card.visible);
        assert_eq!(card.kind, ChartKind::Bubble);

        let radii: Vec<f64> = card.points.iter().map(|p| p.r).collect();
        assert_eq!(radii, vec![35.0, 17.5, 6.0]);
        let sony = &card.points[1];
        assert_eq!((sony.x, sony.y, sony.label.as_str()), (300.0, -20.0, "Sony"));
        assert_eq!(card.palette[1], "rgba(16, 185, 129, 0.7)");
    }

    #[test]
    fn brand_bubbles_without_units_keep_minimum_radius() {
        let mut series = DashboardSeries::default();
        series.by_brand.add("Apple", 900.0, 90.0, 0.0);
        series.by_brand.add("Sony", 300.0, 30.0, 0.5);

        let charts = ChartRenderer::new().build(&series);
        let radii: Vec<f64> = charts
            .card(CardId::BrandBubble)
            .unwrap()
            .points
            .iter()
            .map(|p| p.r)
            .collect();
        // largest quantity below one still divides by one
        assert_eq!(radii, vec![6.0, 17.5]);
    }

    #[test]
    fn palette_cycles_past_ten_brands() {
        let mut series = DashboardSeries::default();
        for i in 0..12 {
            series.by_brand.add(&format!("B{}", i), 1.0, 0.0, 1.0);
        }
        let charts = ChartRenderer::new().build(&series);
        let card = charts.card(CardId::BrandBubble).unwrap();
        assert_eq!(card.palette.len(), 12);
        assert_eq!(card.palette[10], card.palette[0]);
    }

    #[test]
    fn revenue_profit_pairs_buckets() {
        let mut series = DashboardSeries::default();
        series.by_time_bucket.add("2024-01", 100.0, 10.0, 0.0);
        series.by_time_bucket.add("2024-02", 80.0, -5.0, 0.0);

        let charts = ChartRenderer::new().build(&series);
        let card = charts.card(CardId::RevenueProfit).unwrap();
        assert!(card.visible);
        assert_eq!(card.kind, ChartKind::DualAxis);
        assert_eq!(card.labels, vec!["2024-01", "2024-02"]);
        assert_eq!(card.values, vec![100.0, 80.0]);
        assert_eq!(card.secondary, vec![10.0, -5.0]);
        assert_eq!(card.secondary_color.as_deref(), Some("#f472b6"));

        let json = serde_json::to_value(card).unwrap();
        assert_eq!(json["kind"], "dualaxis");
        assert_eq!(json["secondaryColor"], "#f472b6");
    }

    #[test]
    fn top_products_keeps_five_slices() {
        let mut series = DashboardSeries::default();
        series.product_stats = (0..7)
            .map(|i| ProductStat {
                label: format!("P{}", i),
                category: "Audio".into(),
                revenue: f64::from(70 - i * 10),
                profit: 0.0,
                quantity: 1.0,
                margin: 0.0,
                margin_band: MarginBand::Thin,
                average_price: f64::from(70 - i * 10),
            })
            .collect();

        let charts = ChartRenderer::new().build(&series);
        let card = charts.card(CardId::TopProducts).unwrap();
        assert!(card.visible);
        assert_eq!(card.labels, vec!["P0", "P1", "P2", "P3", "P4"]);
        assert_eq!(card.values, vec![70.0, 60.0, 50.0, 40.0, 30.0]);
        assert_eq!(card.palette.len(), 10);
    }

    #[test]
    fn trend_needs_two_buckets() {
        let mut series = DashboardSeries::default();
        series.by_time_bucket.add("2024-01", 10.0, 0.0, 0.0);
        let charts = ChartRenderer::new().build(&series);
        assert!(!charts.card(CardId::Trend).unwrap().visible);

        series.by_time_bucket.add("2024-02", 20.0, 0.0, 0.0);
        let charts = ChartRenderer::new().build(&series);
        let trend = charts.card(CardId::Trend).unwrap();
        assert!(trend.visible);
        assert_eq!(trend.values, vec![10.0, 20.0]);
        assert_eq!(
            trend.fill.as_ref().unwrap().from,
            "rgba(16, 185, 129, 0.25)"
        );
    }

    #[test]
    fn scatter_threshold_and_cap() {
        let mut series = DashboardSeries::default();
        series.scatter_points = (1..=2).map(|n| point(f64::from(n))).collect();
        let charts = ChartRenderer::new().build(&series);
        assert!(!charts.card(CardId::Scatter).unwrap().visible);

        series.scatter_points = (1..=75).map(|n| point(f64::from(n))).collect();
        let charts = ChartRenderer::new().build(&series);
        let scatter = charts.card(CardId::Scatter).unwrap();
        assert!(scatter.visible);
        assert_eq!(scatter.points.len(), 60);
    }

    #[test]
    fn bar_cards_are_horizontal_and_truncated() {
        let mut series = DashboardSeries::default();
        series.top_by_revenue = (0..12).map(|i| ranked(&format!("R{}", i), 100.0)).collect();
        series.top_brands = (0..10)
            .map(|i| GroupEntry {
                label: format!("B{}", i),
                revenue: 1.0,
                ..Default::default()
            })
            .collect();

        let charts = ChartRenderer::new().build(&series);
        let top = charts.card(CardId::TopRevenue).unwrap();
        assert!(top.horizontal);
        assert_eq!(top.labels.len(), 10);
        assert_eq!(top.color, "#8b5cf6");
        assert_eq!(charts.card(CardId::Brands).unwrap().labels.len(), 8);
        assert!(!charts.card(CardId::TopProfit).unwrap().visible);
    }

    #[test]
    fn card_serializes_camel_case() {
        let mut series = DashboardSeries::default();
        series.top_by_profit = vec![ranked("A", 50.0)];
        let charts = ChartRenderer::new().build(&series);
        let json = serde_json::to_value(charts.card(CardId::TopProfit).unwrap()).unwrap();
        assert_eq!(json["id"], "topProfit");
        assert_eq!(json["kind"], "bar");
        assert_eq!(json["values"][0], 5.0);
        assert!(json.get("points").is_none());
    }
}
