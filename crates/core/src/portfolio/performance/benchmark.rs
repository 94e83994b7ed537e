//! Buy-and-hold benchmark that mirrors a portfolio's external flows.

use rust_decimal::Decimal;

use super::performance_model::ValuePoint;
use crate::errors::Result;
use crate::market_data::{MarketDataError, PriceSeries};

/// Values a synthetic holding of `symbol` bought with the portfolio's
/// starting value and topped up or drawn down by the same flows.
///
/// Fails with `PRICE_NOT_AVAILABLE` when the benchmark has no close on or
/// before a day of the range.
pub fn benchmark_points(
    symbol: &str,
    points: &[ValuePoint],
    prices: &PriceSeries,
) -> Result<Vec<ValuePoint>> {
    let mut units = Decimal::ZERO;
    let mut benchmark = Vec::with_capacity(points.len());
    for (i, point) in points.iter().enumerate() {
        let price = prices
            .price_on_or_before(point.date)
            .filter(|price| *price > Decimal::ZERO)
            .ok_or_else(|| MarketDataError::PriceNotFound {
                symbol: symbol.to_string(),
                date: point.date,
            })?;
        if i == 0 {
            units = point.value / price;
        } else {
            units += point.flow / price;
        }
        benchmark.push(ValuePoint {
            date: point.date,
            value: units * price,
            flow: if i == 0 { Decimal::ZERO } else { point.flow },
        });
    }
    Ok(benchmark)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::d;
    use rust_decimal_macros::dec;

    #[test]
    fn test_benchmark_tracks_price_and_flows() {
        let mut prices = PriceSeries::default();
        prices.insert(d(2024, 1, 1), dec!(100));
        prices.insert(d(2024, 7, 1), dec!(110));
        prices.insert(d(2024, 12, 31), dec!(121));
        let points = [
            ValuePoint {
                date: d(2024, 1, 1),
                value: dec!(10000),
                flow: dec!(0),
            },
            ValuePoint {
                date: d(2024, 7, 1),
                value: dec!(16000),
                flow: dec!(5500),
            },
            ValuePoint {
                date: d(2024, 12, 31),
                value: dec!(17000),
                flow: dec!(0),
            },
        ];

        let benchmark = benchmark_points("SPY", &points, &prices).unwrap();

        // 100 units, then 50 more at 110.
        assert_eq!(benchmark[0].value, dec!(10000));
        assert_eq!(benchmark[1].value, dec!(16500));
        assert_eq!(benchmark[1].flow, dec!(5500));
        assert_eq!(benchmark[2].value, dec!(18150));
    }

    #[test]
    fn test_missing_benchmark_price_fails() {
        let points = [ValuePoint {
            date: d(2024, 1, 1),
            value: dec!(10000),
            flow: dec!(0),
        }];

        let err = benchmark_points("SPY", &points, &PriceSeries::default()).unwrap_err();
        assert_eq!(err.code(), "PRICE_NOT_AVAILABLE");
    }
}
