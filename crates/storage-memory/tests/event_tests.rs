//! Domain events emitted after commits.

use rust_decimal_macros::dec;

use foliotrack_core::events::DomainEvent;
use foliotrack_core::portfolios::{CostBasisMethod, PortfolioServiceTrait};
use foliotrack_core::transactions::{TransactionServiceTrait, TransactionType};

mod common;
use common::*;

#[test]
fn test_committed_transaction_emits_change_and_rederive() {
    let (t, events) = setup_with_events();
    let p = t.portfolio(CostBasisMethod::Fifo);
    let buy = t.buy(&p.id, "AAPL", d(2024, 1, 2), dec!(5), dec!(100));

    assert_eq!(
        events.events_for(&p.id),
        vec![
            DomainEvent::transactions_changed(
                p.id.clone(),
                vec![buy.id.clone()],
                vec!["AAPL".to_string()],
            ),
            DomainEvent::ledger_rederived(p.id.clone(), Some(d(2024, 1, 2))),
        ]
    );
}

#[test]
fn test_rejected_write_emits_nothing() {
    let (t, events) = setup_with_events();
    let p = t.portfolio(CostBasisMethod::Fifo);
    t.buy(&p.id, "AAPL", d(2024, 1, 2), dec!(5), dec!(100));
    let before = events.len();

    let err = t
        .engine
        .transaction_service
        .create_transaction(
            &t.ctx,
            &p.id,
            trade(TransactionType::Sell, "AAPL", d(2024, 2, 1), dec!(50), dec!(110)),
        )
        .unwrap_err();

    assert_eq!(err.code(), "INSUFFICIENT_SHARES");
    assert_eq!(events.len(), before);
}

#[test]
fn test_deleting_portfolio_emits_deleted_last() {
    let (t, events) = setup_with_events();
    let p = t.portfolio(CostBasisMethod::Fifo);
    t.buy(&p.id, "AAPL", d(2024, 1, 2), dec!(5), dec!(100));

    t.engine
        .portfolio_service
        .delete_portfolio(&t.ctx, &p.id)
        .unwrap();

    assert_eq!(
        events.events_for(&p.id).last(),
        Some(&DomainEvent::portfolio_deleted(p.id.clone()))
    );
}
