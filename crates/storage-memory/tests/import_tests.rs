//! Bulk imports: row validation, commit policies and batch deletion.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use foliotrack_core::imports::{CommitPolicy, ImportRequest, ImportServiceTrait};
use foliotrack_core::portfolio::lots::TaxLot;
use foliotrack_core::portfolios::CostBasisMethod;
use foliotrack_core::query::{GainQuery, PortfolioQueryServiceTrait};
use foliotrack_core::transactions::{TransactionFilter, TransactionServiceTrait, TransactionType};

mod common;
use common::*;

fn request(policy: CommitPolicy) -> ImportRequest {
    ImportRequest {
        batch_id: None,
        source: "csv:broker-2024.csv".to_string(),
        records: vec![
            trade(TransactionType::Buy, "aapl", d(2024, 1, 2), dec!(10), dec!(100)),
            trade(TransactionType::Sell, "AAPL", d(2024, 2, 1), dec!(25), dec!(110)),
            cash(TransactionType::Dividend, d(2024, 3, 1), dec!(4.5)),
            trade(TransactionType::Buy, "MSFT", d(2024, 3, 5), dec!(3), dec!(400)),
        ],
        policy,
    }
}

fn open_lots(t: &TestEngine, portfolio_id: &str) -> Vec<TaxLot> {
    t.engine
        .query_service
        .tax_lots(&t.ctx, portfolio_id, None)
        .unwrap()
}

#[test]
fn test_all_or_nothing_rejects_whole_batch() {
    let t = setup();
    let p = t.portfolio(CostBasisMethod::Fifo);

    let result = t
        .engine
        .import_service
        .import_transactions(&t.ctx, &p.id, request(CommitPolicy::AllOrNothing))
        .unwrap();

    assert!(!result.committed);
    assert_eq!(result.success_count, 3);
    assert_eq!(result.failure_count, 1);
    let failed: Vec<_> = result.errors().collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].row, 2);
    assert_eq!(
        failed[0].error.as_ref().map(|e| e.code.as_str()),
        Some("INSUFFICIENT_SHARES")
    );

    assert!(t
        .engine
        .transaction_service
        .list_transactions(&t.ctx, &p.id, TransactionFilter::default())
        .unwrap()
        .is_empty());
    assert!(t
        .engine
        .import_service
        .list_batches(&t.ctx, &p.id)
        .unwrap()
        .is_empty());
}

#[test]
fn test_valid_rows_only_commits_the_rest() {
    let t = setup();
    let p = t.portfolio(CostBasisMethod::Fifo);

    let result = t
        .engine
        .import_service
        .import_transactions(&t.ctx, &p.id, request(CommitPolicy::ValidRowsOnly))
        .unwrap();

    assert!(result.committed);
    assert_eq!(result.success_count, 3);
    let stored = t
        .engine
        .transaction_service
        .list_transactions(&t.ctx, &p.id, TransactionFilter::default())
        .unwrap();
    assert_eq!(stored.len(), 3);
    assert!(stored
        .iter()
        .all(|tx| tx.import_batch_id.as_deref() == Some(result.batch_id.as_str())));
    assert_eq!(stored[0].symbol.as_deref(), Some("AAPL"));

    let lots = open_lots(&t, &p.id);
    assert_eq!(lots.len(), 2);

    let batches = t.engine.import_service.list_batches(&t.ctx, &p.id).unwrap();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].success_count, 3);
    assert_eq!(batches[0].failure_count, 1);
}

#[test]
fn test_duplicate_rows_are_flagged() {
    let t = setup();
    let p = t.portfolio(CostBasisMethod::Fifo);
    t.buy(&p.id, "AAPL", d(2024, 1, 2), dec!(10), dec!(100));

    let result = t
        .engine
        .import_service
        .check_import(
            &t.ctx,
            &p.id,
            ImportRequest {
                batch_id: None,
                source: "bulk".to_string(),
                records: vec![
                    trade(TransactionType::Buy, "AAPL", d(2024, 1, 2), dec!(10), dec!(100)),
                    cash(TransactionType::Deposit, d(2024, 1, 1), dec!(500)),
                    cash(TransactionType::Deposit, d(2024, 1, 1), dec!(500)),
                ],
                policy: CommitPolicy::ValidRowsOnly,
            },
        )
        .unwrap();

    let codes: Vec<Option<&str>> = result
        .rows
        .iter()
        .map(|row| row.error.as_ref().map(|e| e.code.as_str()))
        .collect();
    assert_eq!(
        codes,
        vec![Some("DUPLICATE_TRANSACTION"), None, Some("DUPLICATE_TRANSACTION")]
    );
    assert!(!result.committed);
    assert_eq!(
        t.engine
            .transaction_service
            .list_transactions(&t.ctx, &p.id, TransactionFilter::default())
            .unwrap()
            .len(),
        1
    );
}

#[test]
fn test_delete_batch_removes_exactly_its_rows() {
    let t = setup();
    let p = t.portfolio(CostBasisMethod::Fifo);
    let manual = t.buy(&p.id, "AAPL", d(2023, 12, 1), dec!(1), dec!(90));
    let result = t
        .engine
        .import_service
        .import_transactions(&t.ctx, &p.id, request(CommitPolicy::ValidRowsOnly))
        .unwrap();

    let deleted = t
        .engine
        .import_service
        .delete_batch(&t.ctx, &p.id, &result.batch_id)
        .unwrap();

    assert_eq!(deleted, 3);
    let remaining = t
        .engine
        .transaction_service
        .list_transactions(&t.ctx, &p.id, TransactionFilter::default())
        .unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, manual.id);
    let lots = open_lots(&t, &p.id);
    assert_eq!(lots.len(), 1);
    assert_eq!(lots[0].id, manual.id);

    let err = t
        .engine
        .import_service
        .delete_batch(&t.ctx, &p.id, &result.batch_id)
        .unwrap_err();
    assert_eq!(err.code(), "BATCH_NOT_FOUND");
}

#[test]
fn test_large_import_with_back_dated_rows_matches_rebuild() {
    let t = setup();
    let p = t.portfolio(CostBasisMethod::Fifo);

    let start = d(2024, 1, 1);
    let mut records: Vec<_> = (0..100)
        .map(|day| {
            trade(
                TransactionType::Buy,
                "VTI",
                start + chrono::Days::new(day),
                dec!(1),
                Decimal::from(200 + day),
            )
        })
        .collect();
    records.push(trade(TransactionType::Sell, "VTI", d(2024, 4, 15), dec!(50), dec!(260)));
    // Sorts before most of the batch.
    records.push(trade(TransactionType::Sell, "VTI", d(2024, 1, 10), dec!(5), dec!(205)));
    records.push(trade(TransactionType::Sell, "VTI", d(2024, 1, 2), dec!(3), dec!(201)));

    let result = t
        .engine
        .import_service
        .import_transactions(
            &t.ctx,
            &p.id,
            ImportRequest {
                batch_id: None,
                source: "csv:history.csv".to_string(),
                records,
                policy: CommitPolicy::ValidRowsOnly,
            },
        )
        .unwrap();

    assert!(result.committed);
    assert_eq!(result.success_count, 102);
    let failed: Vec<_> = result.errors().collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].row, 103);
    assert_eq!(
        failed[0].error.as_ref().map(|e| e.code.as_str()),
        Some("INSUFFICIENT_SHARES")
    );

    let lots = open_lots(&t, &p.id);
    assert_eq!(lots.len(), 45);
    assert_eq!(lots[0].purchase_date, d(2024, 2, 25));

    let rebuilt = t.engine.ledger_service.rederive(&p).unwrap();
    assert_eq!(rebuilt.lots, lots);
    assert_eq!(
        t.engine
            .query_service
            .realized_gains(&t.ctx, &p.id, &GainQuery::default())
            .unwrap()
            .len(),
        rebuilt.realized_gains.len()
    );
}
