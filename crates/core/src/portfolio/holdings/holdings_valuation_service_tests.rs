use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

use super::holdings_model::Holding;
use super::holdings_valuation_service::HoldingsValuationService;
use crate::test_fixtures::*;

fn holding(symbol: &str, quantity: Decimal, cost: Decimal, currency: &str) -> Holding {
    Holding {
        portfolio_id: "p1".to_string(),
        symbol: symbol.to_string(),
        quantity,
        total_cost_basis: cost,
        avg_cost_price: cost.checked_div(quantity),
        currency: currency.to_string(),
        lot_count: 1,
        first_purchase_date: d(2024, 1, 2),
    }
}

#[test]
fn test_values_holding_in_base_currency() {
    let oracle = TableOracle::new().close("AAPL", d(2024, 6, 28), dec!(150));
    let service = HoldingsValuationService::new(Arc::new(oracle));

    let valued = service.value_holding(holding("AAPL", dec!(10), dec!(1000), "USD"), "USD");

    assert_eq!(valued.price, Some(dec!(150)));
    assert_eq!(valued.price_date, Some(d(2024, 6, 28)));
    assert_eq!(valued.fx_rate_to_base, Some(dec!(1)));
    let market = valued.market_value.unwrap();
    assert_eq!(market.base, dec!(1500));
    let gain = valued.unrealized_gain.unwrap();
    assert_eq!(gain.local, dec!(500));
    assert_eq!(valued.unrealized_gain_pct, Some(dec!(50)));
}

#[test]
fn test_converts_foreign_quotes_with_fx_rate() {
    let oracle = TableOracle::new()
        .close("SAP", d(2024, 6, 28), dec!(100))
        .currency("SAP", "EUR")
        .rate("EUR", "USD", dec!(1.1));
    let service = HoldingsValuationService::new(Arc::new(oracle));

    let valued = service.value_holding(holding("SAP", dec!(5), dec!(400), "EUR"), "USD");

    let market = valued.market_value.unwrap();
    assert_eq!(market.local, dec!(500));
    assert_eq!(market.base, dec!(550.0));
    assert_eq!(valued.cost_basis.base, dec!(440.0));
    assert_eq!(valued.unrealized_gain.unwrap().base, dec!(110.0));
}

#[test]
fn test_missing_quote_leaves_fields_null() {
    let service = HoldingsValuationService::new(Arc::new(TableOracle::new()));

    let valued = service.value_holding(holding("XYZ", dec!(3), dec!(30), "USD"), "USD");

    assert!(valued.price.is_none());
    assert!(valued.market_value.is_none());
    assert!(valued.unrealized_gain.is_none());
    assert!(valued.unrealized_gain_pct.is_none());
    assert_eq!(valued.cost_basis.local, dec!(30));
}

#[test]
fn test_missing_fx_rate_leaves_holding_unpriced() {
    let oracle = TableOracle::new()
        .close("SAP", d(2024, 6, 28), dec!(100))
        .currency("SAP", "EUR");
    let service = HoldingsValuationService::new(Arc::new(oracle));

    let valued = service.value_holding(holding("SAP", dec!(5), dec!(400), "EUR"), "USD");

    assert!(valued.market_value.is_none());
    assert!(valued.fx_rate_to_base.is_none());
}

#[test]
fn test_summary_totals_count_unpriced_at_cost() {
    let oracle = TableOracle::new().close("AAPL", d(2024, 6, 28), dec!(150));
    let service = HoldingsValuationService::new(Arc::new(oracle));

    let summary = service.summarize(
        "p1",
        vec![
            holding("AAPL", dec!(10), dec!(1000), "USD"),
            holding("XYZ", dec!(3), dec!(30), "USD"),
        ],
        "USD",
    );

    assert_eq!(summary.holdings.len(), 2);
    assert_eq!(summary.total_market_value, dec!(1530));
    assert_eq!(summary.total_cost_basis, dec!(1030));
    assert_eq!(summary.total_unrealized_gain, dec!(500));
    assert_eq!(summary.unpriced_symbols, vec!["XYZ".to_string()]);
}

#[test]
fn test_valued_holding_serializes_flat() {
    let oracle = TableOracle::new().close("AAPL", d(2024, 6, 28), dec!(150));
    let service = HoldingsValuationService::new(Arc::new(oracle));

    let valued = service.value_holding(holding("AAPL", dec!(10), dec!(1000), "USD"), "USD");
    let json = serde_json::to_value(&valued).unwrap();

    assert_eq!(json["symbol"], "AAPL");
    let avg: Decimal = json["avgCostPrice"].as_str().unwrap().parse().unwrap();
    assert_eq!(avg, dec!(100));
    let base: Decimal = json["marketValue"]["base"].as_str().unwrap().parse().unwrap();
    assert_eq!(base, dec!(1500));
}
