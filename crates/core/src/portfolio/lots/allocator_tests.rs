use chrono::{NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::*;
use crate::errors::LedgerError;
use crate::portfolios::CostBasisMethod;
use crate::transactions::LotSelection;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn lot(id: &str, purchase_date: NaiveDate, quantity: Decimal, cost_basis: Decimal, seq: i64) -> TaxLot {
    TaxLot {
        id: id.to_string(),
        portfolio_id: "p1".to_string(),
        symbol: "AAPL".to_string(),
        purchase_date,
        quantity,
        cost_basis,
        currency: "USD".to_string(),
        source_transaction_id: id.to_string(),
        created_at: Utc.timestamp_opt(1_700_000_000 + seq, 0).unwrap(),
    }
}

fn s1_lots() -> Vec<TaxLot> {
    vec![
        lot("lot1", d(2023, 1, 2), dec!(10), dec!(1000), 1),
        lot("lot2", d(2023, 6, 1), dec!(10), dec!(1200), 2),
    ]
}

fn select(lot_id: &str, quantity: Decimal) -> LotSelection {
    LotSelection {
        lot_id: lot_id.to_string(),
        quantity,
    }
}

#[test]
fn test_fifo_consumes_oldest_first() {
    let outcome = allocate("AAPL", &s1_lots(), dec!(15), d(2024, 7, 1), CostBasisMethod::Fifo, None).unwrap();

    assert_eq!(outcome.allocations.len(), 2);
    let first = &outcome.allocations[0];
    assert_eq!((first.lot_id.as_str(), first.quantity, first.cost_basis), ("lot1", dec!(10), dec!(1000)));
    assert!(first.is_long_term);
    let second = &outcome.allocations[1];
    assert_eq!((second.lot_id.as_str(), second.quantity, second.cost_basis), ("lot2", dec!(5), dec!(600)));
    assert!(!second.is_long_term);

    assert_eq!(outcome.remaining_lots.len(), 1);
    assert_eq!(outcome.remaining_lots[0].id, "lot2");
    assert_eq!(outcome.remaining_lots[0].quantity, dec!(5));
    assert_eq!(outcome.remaining_lots[0].cost_basis, dec!(600));
}

#[test]
fn test_lifo_consumes_newest_first() {
    let outcome = allocate("AAPL", &s1_lots(), dec!(15), d(2024, 7, 1), CostBasisMethod::Lifo, None).unwrap();

    assert_eq!(outcome.allocations[0].lot_id, "lot2");
    assert_eq!(outcome.allocations[0].cost_basis, dec!(1200));
    assert_eq!(outcome.allocations[1].lot_id, "lot1");
    assert_eq!(outcome.allocations[1].quantity, dec!(5));
    assert_eq!(outcome.allocations[1].cost_basis, dec!(500));
    assert_eq!(outcome.remaining_lots[0].cost_basis, dec!(500));
}

#[test]
fn test_same_purchase_date_breaks_ties_by_creation() {
    let lots = vec![
        lot("late", d(2024, 1, 1), dec!(5), dec!(60), 9),
        lot("early", d(2024, 1, 1), dec!(5), dec!(50), 1),
    ];
    let fifo = allocate("AAPL", &lots, dec!(5), d(2024, 2, 1), CostBasisMethod::Fifo, None).unwrap();
    assert_eq!(fifo.allocations[0].lot_id, "early");
    let lifo = allocate("AAPL", &lots, dec!(5), d(2024, 2, 1), CostBasisMethod::Lifo, None).unwrap();
    assert_eq!(lifo.allocations[0].lot_id, "late");
}

#[test]
fn test_specific_lot_follows_selection_order() {
    let selections = vec![select("lot2", dec!(5)), select("lot1", dec!(3))];
    let outcome = allocate(
        "AAPL",
        &s1_lots(),
        dec!(8),
        d(2024, 7, 1),
        CostBasisMethod::SpecificLot,
        Some(&selections),
    )
    .unwrap();

    assert_eq!(outcome.allocations[0].lot_id, "lot2");
    assert_eq!(outcome.allocations[0].cost_basis, dec!(600));
    assert_eq!(outcome.allocations[1].lot_id, "lot1");
    assert_eq!(outcome.allocations[1].cost_basis, dec!(300));
    assert_eq!(outcome.allocated_quantity(), dec!(8));
}

#[test]
fn test_specific_lot_merges_repeated_lots() {
    let selections = vec![select("lot1", dec!(2)), select("lot1", dec!(3))];
    let outcome = allocate(
        "AAPL",
        &s1_lots(),
        dec!(5),
        d(2024, 7, 1),
        CostBasisMethod::SpecificLot,
        Some(&selections),
    )
    .unwrap();
    assert_eq!(outcome.allocations.len(), 1);
    assert_eq!(outcome.allocations[0].quantity, dec!(5));
}

#[test]
fn test_specific_lot_validation_errors() {
    let date = d(2024, 7, 1);
    let lots = s1_lots();

    let mismatch = vec![select("lot1", dec!(7))];
    assert_eq!(
        allocate("AAPL", &lots, dec!(8), date, CostBasisMethod::SpecificLot, Some(&mismatch)).unwrap_err(),
        LedgerError::LotSelectionMismatch {
            selected: dec!(7),
            requested: dec!(8)
        }
    );

    let unknown = vec![select("nope", dec!(8))];
    assert_eq!(
        allocate("AAPL", &lots, dec!(8), date, CostBasisMethod::SpecificLot, Some(&unknown)).unwrap_err(),
        LedgerError::LotNotFound {
            lot_id: "nope".to_string()
        }
    );

    let too_many = vec![select("lot1", dec!(11))];
    assert!(matches!(
        allocate("AAPL", &lots, dec!(11), date, CostBasisMethod::SpecificLot, Some(&too_many)).unwrap_err(),
        LedgerError::InsufficientShares { available, .. } if available == dec!(10)
    ));

    assert_eq!(
        allocate("AAPL", &lots, dec!(1), date, CostBasisMethod::SpecificLot, None).unwrap_err(),
        LedgerError::LotSelectionRequired
    );
}

#[test]
fn test_insufficient_shares_reports_availability() {
    let err = allocate("AAPL", &s1_lots(), dec!(21), d(2024, 7, 1), CostBasisMethod::Fifo, None).unwrap_err();
    assert_eq!(
        err,
        LedgerError::InsufficientShares {
            symbol: "AAPL".to_string(),
            date: d(2024, 7, 1),
            requested: dec!(21),
            available: dec!(20),
        }
    );
}

#[test]
fn test_partial_allocation_conserves_cost_exactly() {
    let lots = vec![lot("thirds", d(2024, 1, 1), dec!(3), dec!(100), 1)];
    let outcome = allocate("AAPL", &lots, dec!(1), d(2024, 2, 1), CostBasisMethod::Fifo, None).unwrap();

    let allocated = outcome.allocated_cost_basis();
    let remaining = outcome.remaining_lots[0].cost_basis;
    assert_eq!(allocated + remaining, dec!(100));
    assert!(allocated > dec!(33.33) && allocated < dec!(33.34));
}

#[test]
fn test_selling_everything_leaves_no_lots() {
    let outcome = allocate("AAPL", &s1_lots(), dec!(20), d(2024, 7, 1), CostBasisMethod::Fifo, None).unwrap();
    assert!(outcome.remaining_lots.is_empty());
    assert_eq!(outcome.allocated_cost_basis(), dec!(2200));
}
