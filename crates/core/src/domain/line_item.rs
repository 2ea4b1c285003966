use rust_decimal::Decimal;
use serde::Serialize;

/// One priced row of a quotation.
///
/// `line_total` is fixed at construction and the fields are only readable, so the
/// `quantity * unit_price` relationship cannot drift after the item is built.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LineItem {
    label: String,
    description: String,
    quantity: i64,
    unit_price: Decimal,
    line_total: Decimal,
}

impl LineItem {
    /// Returns `None` when the product does not fit in a `Decimal`.
    pub fn try_new(
        label: impl Into<String>,
        description: impl Into<String>,
        quantity: i64,
        unit_price: Decimal,
    ) -> Option<Self> {
        let line_total = Decimal::from(quantity).checked_mul(unit_price)?;
        Some(Self {
            label: label.into(),
            description: description.into(),
            quantity,
            unit_price,
            line_total,
        })
    }

    /// One unit at zero price, used when a row cannot be priced as given.
    pub fn unpriced(label: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            description: description.into(),
            quantity: 1,
            unit_price: Decimal::ZERO,
            line_total: Decimal::ZERO,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn unit_price(&self) -> Decimal {
        self.unit_price
    }

    pub fn line_total(&self) -> Decimal {
        self.line_total
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::LineItem;

    #[test]
    fn line_total_is_quantity_times_unit_price() {
        let cases = [(0, Decimal::new(999, 2)), (3, Decimal::new(1250, 2)), (7, Decimal::ZERO)];
        for (quantity, unit_price) in cases {
            let item = LineItem::try_new("Widget", "A", quantity, unit_price).expect("fits");
            assert_eq!(item.line_total(), Decimal::from(quantity) * unit_price);
        }
    }

    #[test]
    fn keeps_full_precision_of_the_product() {
        let item = LineItem::try_new("Bolt", "M6", 3, Decimal::new(3333, 3)).expect("fits");
        assert_eq!(item.line_total(), Decimal::new(9999, 3));
    }

    #[test]
    fn overflowing_product_is_refused() {
        assert!(LineItem::try_new("Huge", "", i64::MAX, Decimal::MAX).is_none());
    }
}
