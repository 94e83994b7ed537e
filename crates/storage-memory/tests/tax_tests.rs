//! Allocation previews, tax reports, loss harvesting and valued holdings.

use rust_decimal_macros::dec;

use foliotrack_core::portfolio::tax::{AllocationPreviewRequest, TaxServiceTrait};
use foliotrack_core::portfolios::CostBasisMethod;
use foliotrack_core::query::{GainQuery, PortfolioQueryServiceTrait};
use foliotrack_core::transactions::{LotSelection, TransactionServiceTrait, TransactionType};

mod common;
use common::*;

fn preview(symbol: &str, method: Option<&str>) -> AllocationPreviewRequest {
    AllocationPreviewRequest {
        symbol: symbol.to_string(),
        quantity: dec!(15),
        method: method.map(str::to_string),
        sale_date: Some(d(2024, 7, 1)),
        price: Some(dec!(150)),
        lot_selections: None,
    }
}

#[test]
fn test_preview_uses_requested_method_without_writing() {
    let t = setup();
    let p = t.portfolio(CostBasisMethod::Fifo);
    t.buy(&p.id, "AAPL", d(2023, 1, 2), dec!(10), dec!(100));
    t.buy(&p.id, "AAPL", d(2024, 3, 1), dec!(10), dec!(120));
    let before = t.engine.db.export_state().unwrap();

    let fifo = t
        .engine
        .tax_service
        .preview_allocation(&t.ctx, &p.id, preview("aapl", None))
        .unwrap();
    assert_eq!(fifo.total_cost_basis, dec!(1600));
    assert_eq!(fifo.estimated_gain, Some(dec!(650)));
    assert_eq!(fifo.long_term_quantity, dec!(10));
    assert_eq!(fifo.short_term_quantity, dec!(5));

    let lifo = t
        .engine
        .tax_service
        .preview_allocation(&t.ctx, &p.id, preview("AAPL", Some("lifo")))
        .unwrap();
    assert_eq!(lifo.total_cost_basis, dec!(1700));
    assert_eq!(lifo.short_term_quantity, dec!(10));

    let err = t
        .engine
        .tax_service
        .preview_allocation(&t.ctx, &p.id, preview("AAPL", Some("HIFO")))
        .unwrap_err();
    assert_eq!(err.code(), "INVALID_METHOD");

    assert_eq!(t.engine.db.export_state().unwrap(), before);
}

#[test]
fn test_specific_lot_sale_follows_selection() {
    let t = setup();
    let p = t.portfolio(CostBasisMethod::SpecificLot);
    let old = t.buy(&p.id, "AAPL", d(2023, 1, 2), dec!(10), dec!(100));
    let new = t.buy(&p.id, "AAPL", d(2024, 3, 1), dec!(10), dec!(120));

    let mut sale = trade(TransactionType::Sell, "AAPL", d(2024, 7, 1), dec!(4), dec!(150));
    let err = t
        .engine
        .transaction_service
        .create_transaction(&t.ctx, &p.id, sale.clone())
        .unwrap_err();
    assert_eq!(err.code(), "VALIDATION_ERROR");

    sale.lot_selections = Some(vec![LotSelection {
        lot_id: new.id.clone(),
        quantity: dec!(4),
    }]);
    t.record(&p.id, sale);

    let lots = t
        .engine
        .query_service
        .tax_lots(&t.ctx, &p.id, Some("AAPL"))
        .unwrap();
    let remaining: Vec<_> = lots.iter().map(|l| (l.id.clone(), l.quantity)).collect();
    assert!(remaining.contains(&(old.id.clone(), dec!(10))));
    assert!(remaining.contains(&(new.id.clone(), dec!(6))));

    let gains = t
        .engine
        .query_service
        .realized_gains(&t.ctx, &p.id, &GainQuery::default())
        .unwrap();
    assert_eq!(gains.len(), 1);
    assert_eq!(gains[0].lot_id, new.id);
    assert_eq!(gains[0].gain, dec!(120));
    assert!(!gains[0].is_long_term);
}

#[test]
fn test_tax_report_and_gain_filters() {
    let t = setup();
    let p = t.portfolio(CostBasisMethod::Fifo);
    t.buy(&p.id, "AAPL", d(2022, 1, 3), dec!(10), dec!(100));
    t.buy(&p.id, "MSFT", d(2023, 5, 1), dec!(5), dec!(300));
    t.sell(&p.id, "AAPL", d(2023, 6, 1), dec!(5), dec!(90));
    t.sell(&p.id, "AAPL", d(2024, 2, 1), dec!(5), dec!(150));
    t.sell(&p.id, "MSFT", d(2024, 3, 1), dec!(5), dec!(280));
    t.record(&p.id, cash(TransactionType::Fee, d(2024, 4, 1), dec!(25)));

    let report = t.engine.tax_service.tax_report(&t.ctx, &p.id, 2024).unwrap();
    assert_eq!(report.long_term.count, 1);
    assert_eq!(report.long_term.gain, dec!(250));
    assert_eq!(report.short_term.count, 1);
    assert_eq!(report.short_term.gain, dec!(-100));
    assert_eq!(report.total_gain, dec!(150));
    assert_eq!(report.fees_paid, dec!(25));

    let only_2023 = t
        .engine
        .query_service
        .realized_gains(
            &t.ctx,
            &p.id,
            &GainQuery {
                symbol: None,
                year: Some(2023),
            },
        )
        .unwrap();
    assert_eq!(only_2023.len(), 1);
    assert_eq!(only_2023[0].gain, dec!(-50));

    let msft = t
        .engine
        .query_service
        .realized_gains(
            &t.ctx,
            &p.id,
            &GainQuery {
                symbol: Some("MSFT".to_string()),
                year: None,
            },
        )
        .unwrap();
    assert_eq!(msft.len(), 1);
}

#[test]
fn test_harvest_ranks_losses_in_base_currency() {
    let t = setup();
    let p = t.portfolio(CostBasisMethod::Fifo);
    t.buy(&p.id, "AAPL", d(2024, 1, 2), dec!(10), dec!(100));
    t.buy(&p.id, "MSFT", d(2024, 1, 2), dec!(10), dec!(100));
    t.buy(&p.id, "TSLA", d(2024, 1, 2), dec!(1), dec!(250));
    let mut sap = trade(TransactionType::Buy, "SAP", d(2024, 1, 2), dec!(10), dec!(50));
    sap.currency = Some("EUR".to_string());
    t.record(&p.id, sap);

    t.close("AAPL", d(2024, 6, 28), dec!(90));
    t.close("MSFT", d(2024, 6, 28), dec!(99));
    t.prices
        .insert_close("SAP", d(2024, 6, 28), dec!(40), "EUR")
        .unwrap();
    t.prices
        .insert_rate("EUR", "USD", d(2024, 6, 28), dec!(1.1))
        .unwrap();

    let report = t
        .engine
        .query_service
        .harvest_opportunities(&t.ctx, &p.id, None)
        .unwrap();

    assert_eq!(report.threshold_pct, dec!(-3));
    let symbols: Vec<&str> = report.opportunities.iter().map(|o| o.symbol.as_str()).collect();
    assert_eq!(symbols, vec!["SAP", "AAPL"]);
    assert_eq!(report.opportunities[0].unrealized_gain, dec!(-100));
    assert_eq!(report.opportunities[0].unrealized_gain_base, dec!(-110));
    assert_eq!(report.total_harvestable_loss, dec!(-210));
    assert_eq!(report.unpriced_symbols, vec!["TSLA".to_string()]);

    let err = t
        .engine
        .tax_service
        .harvest_opportunities(&t.ctx, &p.id, Some(dec!(12)))
        .unwrap_err();
    assert_eq!(err.code(), "INVALID_THRESHOLD");

    let holdings = t.engine.query_service.holdings(&t.ctx, &p.id).unwrap();
    assert_eq!(holdings.unpriced_symbols, vec!["TSLA".to_string()]);
    let sap = holdings
        .holdings
        .iter()
        .find(|h| h.holding.symbol == "SAP")
        .unwrap();
    assert_eq!(sap.market_value.as_ref().map(|v| v.base), Some(dec!(440)));
    assert_eq!(sap.fx_rate_to_base, Some(dec!(1.1)));
    assert_eq!(holdings.total_market_value, dec!(900) + dec!(990) + dec!(250) + dec!(440));
}
