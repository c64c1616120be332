//! Aggregation of normalized records into dashboard series
//!
//! One pass over the records accumulates totals and the per-brand,
//! per-category, per-product and per-time-bucket sums; rankings are stable
//! descending sorts so that ties keep input order.

use std::cmp::Ordering;
use std::collections::HashMap;

use datana_core::series::descending;
use datana_core::{
    DashboardSeries, GroupEntry, GroupTotals, GrowthMarker, GrowthPoint, MarginBand,
    NormalizedRecord, ProductStat, RankedRecord, ScatterPoint,
};

use crate::config::{BucketGranularity, BucketOrder, EngineConfig};
use crate::filter::{parse_date, MISSING_DATE};

/// Aggregate records into the dashboard series
pub fn aggregate(records: &[NormalizedRecord], config: &EngineConfig) -> DashboardSeries {
    let mut series = DashboardSeries {
        row_count: records.len(),
        ..Default::default()
    };
    let mut by_product = GroupTotals::new();
    let mut product_category: HashMap<String, String> = HashMap::new();

    for record in records {
        let revenue = record.revenue;
        let profit = record.profit;
        let quantity = record.quantity;

        series.total_revenue += revenue;
        series.total_profit += profit;
        series.total_quantity += quantity;
        if record.is_unreadable() {
            series.unreadable_rows += 1;
        }

        let product = label_or(&record.product, &config.unknown_product);
        let brand = label_or(&record.brand, &config.unknown_brand);
        let category = label_or(&record.category, &config.unknown_category);

        series.by_brand.add(brand, revenue, profit, quantity);
        series.by_category.add(category, revenue, profit, quantity);
        by_product.add(product, revenue, profit, quantity);
        product_category
            .entry(product.to_string())
            .or_insert_with(|| category.to_string());

        if let Some(bucket) = time_bucket(&record.date, config.bucket_granularity) {
            series.by_time_bucket.add(&bucket, revenue, profit, quantity);
        }

        if revenue > 0.0 && record.price > 0.0 && quantity > 0.0 {
            series.scatter_points.push(ScatterPoint {
                x: record.price,
                y: quantity,
                r: bubble_radius(profit),
                label: product.to_string(),
            });
        }
    }

    series.average_margin = margin(series.total_profit, series.total_revenue);

    // Records by revenue feed three views
    let by_revenue = rank_records(records, |r| r.revenue);
    series.top_product = by_revenue
        .first()
        .map(|r| r.product.clone())
        .filter(|p| !p.is_empty());
    series.top_by_revenue = by_revenue.iter().take(config.top_records).cloned().collect();
    series.detail_rows = by_revenue.into_iter().take(config.detail_rows).collect();
    series.top_by_profit = rank_records(records, |r| r.profit)
        .into_iter()
        .take(config.top_records)
        .collect();

    series.top_brands = series
        .by_brand
        .ranked_by(|e| e.revenue)
        .into_iter()
        .take(config.top_brands)
        .collect();
    series.top_categories = series.by_category.ranked_by(|e| e.revenue);

    let stat = |entry: GroupEntry| product_stat(entry, &product_category);
    series.product_stats = by_product.ranked_by(|e| e.revenue).into_iter().map(stat).collect();
    series.best_sellers = by_product
        .ranked_by(|e| e.quantity)
        .into_iter()
        .take(config.best_sellers)
        .map(stat)
        .collect();

    sort_buckets(&mut series.by_time_bucket, config.bucket_order);
    series.monthly_growth = growth_series(&series.by_time_bucket);

    tracing::debug!(
        rows = series.row_count,
        brands = series.by_brand.len(),
        categories = series.by_category.len(),
        buckets = series.by_time_bucket.len(),
        scatter = series.scatter_points.len(),
        unreadable = series.unreadable_rows,
        "aggregated dashboard series"
    );
    series
}

fn label_or<'a>(text: &'a str, placeholder: &'a str) -> &'a str {
    if text.is_empty() {
        placeholder
    } else {
        text
    }
}

/// Bucket key for a date text, `None` when the text is too short to be a date
pub fn time_bucket(date: &str, granularity: BucketGranularity) -> Option<String> {
    if date == MISSING_DATE || date.chars().count() <= 4 {
        return None;
    }
    let key = match granularity {
        BucketGranularity::Raw => date.to_string(),
        BucketGranularity::Month => parse_date(date)
            .map(|d| d.format("%Y-%m").to_string())
            .unwrap_or_else(|| date.to_string()),
    };
    Some(key)
}

/// Bubble size: log-dampened absolute profit, clamped to [3, 8]
pub fn bubble_radius(profit: f64) -> f64 {
    ((profit.abs() + 1.0).log10() * 2.0 + 1.0).clamp(3.0, 8.0)
}

fn margin(profit: f64, revenue: f64) -> f64 {
    if revenue > 0.0 {
        profit / revenue * 100.0
    } else {
        0.0
    }
}

fn rank_records(
    records: &[NormalizedRecord],
    metric: impl Fn(&NormalizedRecord) -> f64,
) -> Vec<RankedRecord> {
    let mut ordered: Vec<&NormalizedRecord> = records.iter().collect();
    ordered.sort_by(|a, b| descending(metric(*a), metric(*b)));
    ordered.into_iter().map(RankedRecord::from).collect()
}

fn product_stat(entry: GroupEntry, categories: &HashMap<String, String>) -> ProductStat {
    let margin = margin(entry.profit, entry.revenue);
    let average_price = if entry.quantity != 0.0 {
        entry.revenue / entry.quantity
    } else {
        0.0
    };
    ProductStat {
        category: categories.get(&entry.label).cloned().unwrap_or_default(),
        label: entry.label,
        revenue: entry.revenue,
        profit: entry.profit,
        quantity: entry.quantity,
        margin,
        margin_band: MarginBand::from_margin(margin),
        average_price,
    }
}

fn sort_buckets(buckets: &mut GroupTotals, order: BucketOrder) {
    match order {
        BucketOrder::Lexical => buckets.sort_by(|a, b| a.label.cmp(&b.label)),
        BucketOrder::Chronological => buckets.sort_by(|a, b| {
            match (parse_date(&a.label), parse_date(&b.label)) {
                (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.label.cmp(&b.label)),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => a.label.cmp(&b.label),
            }
        }),
    }
}

/// Month-over-month growth over already ordered buckets
pub fn growth_series(buckets: &GroupTotals) -> Vec<GrowthPoint> {
    let mut previous = 0.0;
    buckets
        .entries()
        .iter()
        .map(|entry| {
            let growth = if previous > 0.0 {
                let percent = (entry.revenue - previous) / previous * 100.0;
                if percent > 0.0 {
                    GrowthMarker::Up { percent }
                } else if percent < 0.0 {
                    GrowthMarker::Down {
                        percent: percent.abs(),
                    }
                } else {
                    GrowthMarker::Flat
                }
            } else if previous == 0.0 && entry.revenue > 0.0 {
                GrowthMarker::Start
            } else {
                GrowthMarker::NotComparable
            };
            previous = entry.revenue;
            GrowthPoint {
                label: entry.label.clone(),
                revenue: entry.revenue,
                profit: entry.profit,
                quantity: entry.quantity,
                growth,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(product: &str, brand: &str, revenue: f64) -> NormalizedRecord {
        NormalizedRecord {
            product: product.into(),
            display_name: product.into(),
            brand: brand.into(),
            revenue,
            ..Default::default()
        }
    }

    #[test]
    fn bubble_radius_is_clamped() {
        assert_eq!(bubble_radius(0.0), 3.0);
        assert_eq!(bubble_radius(-9.0), 3.0);
        // log10(100) * 2 + 1 = 5
        assert!((bubble_radius(99.0) - 5.0).abs() < 1e-9);
        assert_eq!(bubble_radius(1e9), 8.0);
    }

    #[test]
    fn time_bucket_heuristic() {
        assert_eq!(time_bucket("N/A", BucketGranularity::Raw), None);
        assert_eq!(time_bucket("2024", BucketGranularity::Raw), None);
        assert_eq!(time_bucket("", BucketGranularity::Raw), None);
        assert_eq!(
            time_bucket("2024-01", BucketGranularity::Raw),
            Some("2024-01".to_string())
        );
        assert_eq!(
            time_bucket("2024-01-15", BucketGranularity::Month),
            Some("2024-01".to_string())
        );
        assert_eq!(
            time_bucket("Tháng 1", BucketGranularity::Month),
            Some("Tháng 1".to_string())
        );
    }

    #[test]
    fn placeholders_fill_missing_labels() {
        let series = aggregate(&[record("", "", 10.0)], &EngineConfig::default());
        assert_eq!(series.by_brand.labels(), vec!["Khác"]);
        assert_eq!(series.by_category.labels(), vec!["Chung"]);
        assert_eq!(series.product_stats[0].label, "Unknown");
        assert_eq!(series.top_product, None);
    }

    #[test]
    fn top_brands_respects_limit() {
        let records: Vec<NormalizedRecord> = (0..12)
            .map(|i| record("p", &format!("brand{}", i), f64::from(i)))
            .collect();
        let series = aggregate(&records, &EngineConfig::default());
        assert_eq!(series.top_brands.len(), 8);
        assert_eq!(series.top_brands[0].label, "brand11");
        assert_eq!(series.by_brand.len(), 12);
    }

    #[test]
    fn growth_markers() {
        let mut buckets = GroupTotals::new();
        buckets.add("2024-01", 0.0, 0.0, 0.0);
        buckets.add("2024-02", 100.0, 0.0, 0.0);
        buckets.add("2024-03", 150.0, 0.0, 0.0);
        buckets.add("2024-04", 150.0, 0.0, 0.0);
        buckets.add("2024-05", 75.0, 0.0, 0.0);

        let growth: Vec<GrowthMarker> = growth_series(&buckets).into_iter().map(|g| g.growth).collect();
        assert_eq!(
            growth,
            vec![
                GrowthMarker::NotComparable,
                GrowthMarker::Start,
                GrowthMarker::Up { percent: 50.0 },
                GrowthMarker::Flat,
                GrowthMarker::Down { percent: 50.0 },
            ]
        );
    }

    #[test]
    fn negative_previous_is_not_comparable() {
        let mut buckets = GroupTotals::new();
        buckets.add("a", -10.0, 0.0, 0.0);
        buckets.add("b", 20.0, 0.0, 0.0);
        let growth = growth_series(&buckets);
        assert_eq!(growth[1].growth, GrowthMarker::NotComparable);
    }

    #[test]
    fn chronological_order_puts_unparseable_last() {
        let mut buckets = GroupTotals::new();
        buckets.add("12/01/2023", 1.0, 0.0, 0.0);
        buckets.add("Quý 1", 1.0, 0.0, 0.0);
        buckets.add("2023-02-01", 1.0, 0.0, 0.0);
        sort_buckets(&mut buckets, BucketOrder::Chronological);
        assert_eq!(buckets.labels(), vec!["2023-02-01", "12/01/2023", "Quý 1"]);

        sort_buckets(&mut buckets, BucketOrder::Lexical);
        assert_eq!(buckets.labels(), vec!["12/01/2023", "2023-02-01", "Quý 1"]);
    }

    #[test]
    fn product_stats_carry_first_category_and_margin() {
        let mut a = record("A", "X", 200.0);
        a.category = "Phone".into();
        a.profit = 80.0;
        a.quantity = 4.0;
        let mut b = record("A", "X", 200.0);
        b.category = "Accessory".into();
        b.profit = -20.0;
        b.quantity = 1.0;

        let series = aggregate(&[a, b], &EngineConfig::default());
        let stat = &series.product_stats[0];
        assert_eq!(stat.category, "Phone");
        assert_eq!(stat.revenue, 400.0);
        assert_eq!(stat.margin, 15.0);
        assert_eq!(stat.margin_band, MarginBand::Normal);
        assert_eq!(stat.average_price, 80.0);
        assert_eq!(series.average_margin, 15.0);
    }

    #[test]
    fn best_sellers_rank_by_quantity() {
        let mut a = record("A", "X", 1000.0);
        a.quantity = 1.0;
        let mut b = record("B", "X", 10.0);
        b.quantity = 9.0;
        let series = aggregate(&[a, b], &EngineConfig::default());
        let labels: Vec<&str> = series.best_sellers.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["B", "A"]);
        assert_eq!(series.top_product.as_deref(), Some("A"));
    }
}
