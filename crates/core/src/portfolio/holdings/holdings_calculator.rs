//! Reduction of open tax lots into holdings.

use rust_decimal::Decimal;
use std::collections::BTreeMap;

use super::holdings_model::Holding;
use crate::portfolio::lots::TaxLot;

/// Aggregates open lots into one holding per symbol, ordered by symbol.
pub fn project_holdings(portfolio_id: &str, lots: &[TaxLot]) -> Vec<Holding> {
    let mut by_symbol: BTreeMap<&str, Holding> = BTreeMap::new();

    for lot in lots.iter().filter(|lot| lot.is_open()) {
        let holding = by_symbol
            .entry(lot.symbol.as_str())
            .or_insert_with(|| Holding {
                portfolio_id: portfolio_id.to_string(),
                symbol: lot.symbol.clone(),
                quantity: Decimal::ZERO,
                total_cost_basis: Decimal::ZERO,
                avg_cost_price: None,
                currency: lot.currency.clone(),
                lot_count: 0,
                first_purchase_date: lot.purchase_date,
            });
        holding.quantity += lot.quantity;
        holding.total_cost_basis += lot.cost_basis;
        holding.lot_count += 1;
        if lot.purchase_date < holding.first_purchase_date {
            holding.first_purchase_date = lot.purchase_date;
        }
    }

    by_symbol
        .into_values()
        .map(|mut holding| {
            holding.avg_cost_price = if holding.quantity.is_zero() {
                None
            } else {
                holding.total_cost_basis.checked_div(holding.quantity)
            };
            holding
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corporate_actions::CorporateActionType;
    use crate::event_store::merge_event_log;
    use crate::portfolio::lots::TaxLotLedger;
    use crate::portfolios::CostBasisMethod;
    use crate::test_fixtures::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_holdings_sum_lots_per_symbol() {
        let transactions = vec![
            buy("b1", "AAPL", d(2023, 1, 2), dec!(10), dec!(100)),
            buy("b2", "AAPL", d(2023, 6, 1), dec!(10), dec!(120)),
            buy("b3", "MSFT", d(2023, 6, 1), dec!(2), dec!(300)),
            sell("s1", "AAPL", d(2024, 7, 1), dec!(15), dec!(150)),
        ];
        let events = merge_event_log(&transactions, &[]);
        let state = TaxLotLedger::replay("p1", CostBasisMethod::Fifo, &events).unwrap();
        let holdings = project_holdings("p1", &state.lots);

        assert_eq!(holdings.len(), 2);
        assert_eq!(holdings[0].symbol, "AAPL");
        assert_eq!(holdings[0].quantity, dec!(5));
        assert_eq!(holdings[0].total_cost_basis, dec!(600));
        assert_eq!(holdings[0].avg_cost_price, Some(dec!(120)));
        assert_eq!(holdings[0].first_purchase_date, d(2023, 6, 1));
        assert_eq!(holdings[1].symbol, "MSFT");
        assert_eq!(holdings[1].lot_count, 1);
    }

    #[test]
    fn test_split_holding_reports_new_average() {
        let transactions = vec![buy("b1", "AAPL", d(2024, 1, 1), dec!(100), dec!(200))];
        let applications = vec![applied(corporate_action(
            "ca1",
            "AAPL",
            CorporateActionType::Split,
            d(2024, 6, 1),
            Some(dec!(2)),
            None,
            None,
        ))];
        let events = merge_event_log(&transactions, &applications);
        let state = TaxLotLedger::replay("p1", CostBasisMethod::Fifo, &events).unwrap();
        let holdings = project_holdings("p1", &state.lots);

        assert_eq!(holdings[0].quantity, dec!(200));
        assert_eq!(holdings[0].total_cost_basis, dec!(20000));
        assert_eq!(holdings[0].avg_cost_price, Some(dec!(100)));
    }

    #[test]
    fn test_empty_lots_project_nothing() {
        assert!(project_holdings("p1", &[]).is_empty());
    }
}
