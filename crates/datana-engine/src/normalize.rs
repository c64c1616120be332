//! Row → record normalization

use datana_core::{FieldKey, NormalizedRecord, Row};

use crate::resolver::FieldResolver;

/// Resolve every field of a row.
///
/// Revenue is back-filled as price × quantity when the resolved revenue is
/// zero and both price and quantity are nonzero. A product that overflows
/// is dropped and revenue stays zero.
pub fn normalize(row: &Row, resolver: &FieldResolver) -> NormalizedRecord {
    let quantity = resolver.number(row, FieldKey::Quantity);
    let price = resolver.number(row, FieldKey::Price);
    let profit = resolver.number(row, FieldKey::Profit);
    let mut revenue = resolver.number(row, FieldKey::Revenue);

    let mut revenue_derived = false;
    if revenue == 0.0 && price != 0.0 && quantity != 0.0 {
        let product = price * quantity;
        if product.is_finite() {
            revenue = product;
            revenue_derived = true;
        } else {
            tracing::debug!(price, quantity, "price × quantity overflows; revenue left at zero");
        }
    }

    NormalizedRecord {
        product: resolver.text(row, FieldKey::Product),
        display_name: resolver.product_name(row),
        brand: resolver.text(row, FieldKey::Brand),
        category: resolver.text(row, FieldKey::Category),
        date: resolver.text(row, FieldKey::Date),
        quantity,
        price,
        profit,
        revenue,
        revenue_derived,
    }
}

/// Normalize a whole dataset, preserving row order
pub fn normalize_all(rows: &[Row], resolver: &FieldResolver) -> Vec<NormalizedRecord> {
    let records: Vec<NormalizedRecord> = rows.iter().map(|row| normalize(row, resolver)).collect();
    tracing::debug!(
        rows = records.len(),
        derived = records.iter().filter(|r| r.revenue_derived).count(),
        "normalized rows"
    );
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use datana_core::Value;
    use pretty_assertions::assert_eq;

    #[test]
    fn revenue_back_filled_from_price_and_quantity() {
        let row = Row::new()
            .with("Product", "A")
            .with("Price", "1,000")
            .with("Quantity", "2");
        let record = normalize(&row, &FieldResolver::new());

        assert_eq!(record.revenue, 2000.0);
        assert!(record.revenue_derived);
        assert_eq!(record.product, "A");
        assert_eq!(record.display_name, "A");
    }

    #[test]
    fn explicit_revenue_wins() {
        let row = Row::new()
            .with("Price", 10.0)
            .with("Quantity", 3.0)
            .with("Revenue", 25.0);
        let record = normalize(&row, &FieldResolver::new());

        assert_eq!(record.revenue, 25.0);
        assert!(!record.revenue_derived);
    }

    #[test]
    fn zero_price_keeps_zero_revenue() {
        let row = Row::new()
            .with("revenue", 0.0)
            .with("price", 0.0)
            .with("quantity", 5.0);
        let record = normalize(&row, &FieldResolver::new());

        assert_eq!(record.revenue, 0.0);
        assert!(!record.revenue_derived);
    }

    #[test]
    fn negative_inputs_still_multiply() {
        // returns: negative quantity, positive price
        let row = Row::new().with("price", 50.0).with("qty", -2.0);
        let record = normalize(&row, &FieldResolver::new());
        assert_eq!(record.revenue, -100.0);
    }

    #[test]
    fn overflowing_back_fill_keeps_revenue_finite() {
        let row = Row::new().with("Price", 1e200).with("Quantity", 1e200);
        let record = normalize(&row, &FieldResolver::new());

        assert_eq!(record.revenue, 0.0);
        assert!(!record.revenue_derived);
        assert_eq!(record.price, 1e200);
    }

    #[test]
    fn malformed_cells_degrade_to_zero_and_empty() {
        let row = Row::new()
            .with("Quantity", "many")
            .with("Price", Value::Empty)
            .with("Brand", Value::Empty);
        let record = normalize(&row, &FieldResolver::new());

        assert_eq!(record.quantity, 0.0);
        assert_eq!(record.price, 0.0);
        assert_eq!(record.brand, "");
        assert!(record.is_unreadable());
    }

    #[test]
    fn normalize_all_preserves_order() {
        let rows = vec![
            Row::new().with("name", "first"),
            Row::new().with("name", "second"),
        ];
        let records = normalize_all(&rows, &FieldResolver::new());
        let names: Vec<&str> = records.iter().map(|r| r.product.as_str()).collect();
        assert_eq!(names, vec!["first", "second"]);
    }
}
