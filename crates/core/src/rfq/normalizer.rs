use std::str::FromStr;

use rust_decimal::Decimal;

use crate::domain::line_item::LineItem;

/// The four positional sequences of an RFQ form, as raw text.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawLineItems {
    pub names: Vec<String>,
    pub values: Vec<String>,
    pub quantities: Vec<String>,
    pub unit_prices: Vec<String>,
}

impl RawLineItems {
    fn longest(&self) -> usize {
        [&self.names, &self.values, &self.quantities, &self.unit_prices]
            .into_iter()
            .map(Vec::len)
            .max()
            .unwrap_or(0)
    }

    fn shortest(&self) -> usize {
        [&self.names, &self.values, &self.quantities, &self.unit_prices]
            .into_iter()
            .map(Vec::len)
            .min()
            .unwrap_or(0)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NormalizedRows {
    pub items: Vec<LineItem>,
    /// Zero-based positions whose quantity or unit price could not be used as given.
    pub fallback_rows: Vec<usize>,
    /// Rows the longest sequence has beyond the shortest one; they are dropped.
    pub truncated_rows: usize,
}

/// Zips the sequences up to the shortest one and prices each row.
///
/// A quantity that does not parse becomes 1 and a unit price that does not parse
/// becomes 0; a row whose product overflows gets both. Row order is preserved.
pub fn normalize(raw: &RawLineItems) -> NormalizedRows {
    let row_count = raw.shortest();
    let mut rows = NormalizedRows {
        items: Vec::with_capacity(row_count),
        fallback_rows: Vec::new(),
        truncated_rows: raw.longest() - row_count,
    };

    for index in 0..row_count {
        let label = raw.names[index].trim();
        let description = raw.values[index].trim();
        let quantity = parse_quantity(&raw.quantities[index]);
        let unit_price = parse_unit_price(&raw.unit_prices[index]);
        let priced = LineItem::try_new(
            label,
            description,
            quantity.unwrap_or(1),
            unit_price.unwrap_or(Decimal::ZERO),
        );

        let item = match priced {
            Some(item) if quantity.is_some() && unit_price.is_some() => item,
            Some(item) => {
                rows.fallback_rows.push(index);
                item
            }
            None => {
                rows.fallback_rows.push(index);
                LineItem::unpriced(label, description)
            }
        };
        rows.items.push(item);
    }

    rows
}

fn parse_quantity(raw: &str) -> Option<i64> {
    raw.trim().parse::<i64>().ok()
}

fn parse_unit_price(raw: &str) -> Option<Decimal> {
    Decimal::from_str(raw.trim()).ok()
}
