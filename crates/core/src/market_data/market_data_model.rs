use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Daily closing price for a symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub symbol: String,
    pub date: NaiveDate,
    pub close: Decimal,
    pub currency: String,
}

/// A symbol's closes indexed by day, with carry-forward lookup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceSeries {
    closes: BTreeMap<NaiveDate, Decimal>,
}

impl PriceSeries {
    pub fn from_quotes(quotes: &[Quote]) -> Self {
        Self {
            closes: quotes.iter().map(|q| (q.date, q.close)).collect(),
        }
    }

    pub fn insert(&mut self, date: NaiveDate, close: Decimal) {
        self.closes.insert(date, close);
    }

    pub fn is_empty(&self) -> bool {
        self.closes.is_empty()
    }

    /// Close on `date`, or the most recent close before it.
    pub fn price_on_or_before(&self, date: NaiveDate) -> Option<Decimal> {
        self.closes.range(..=date).next_back().map(|(_, close)| *close)
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.closes.keys().next().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_price_on_or_before_carries_forward() {
        let d = |day| NaiveDate::from_ymd_opt(2024, 1, day).unwrap();
        let mut series = PriceSeries::default();
        series.insert(d(2), dec!(100));
        series.insert(d(5), dec!(105));

        assert_eq!(series.price_on_or_before(d(1)), None);
        assert_eq!(series.price_on_or_before(d(2)), Some(dec!(100)));
        assert_eq!(series.price_on_or_before(d(4)), Some(dec!(100)));
        assert_eq!(series.price_on_or_before(d(9)), Some(dec!(105)));
    }
}
