use rust_decimal_macros::dec;
use std::str::FromStr;

use super::*;
use crate::portfolios::CostBasisMethod;
use crate::test_fixtures::*;

fn new_buy() -> NewTransaction {
    NewTransaction {
        id: None,
        transaction_type: TransactionType::Buy,
        symbol: Some(" aapl ".to_string()),
        date: d(2024, 1, 2),
        quantity: dec!(10),
        price: Some(dec!(100)),
        commission: dec!(1),
        currency: None,
        notes: Some("   ".to_string()),
        lot_selections: None,
    }
}

#[test]
fn test_transaction_type_parsing_and_wire_names() {
    assert_eq!(TransactionType::from_str("buy").unwrap(), TransactionType::Buy);
    assert_eq!(TransactionType::from_str(" WITHDRAWAL ").unwrap(), TransactionType::Withdrawal);
    assert!(TransactionType::from_str("TRANSFER").is_err());
    assert_eq!(serde_json::to_string(&TransactionType::Fee).unwrap(), "\"FEE\"");
    assert!(TransactionType::Sell.is_trade());
    assert!(!TransactionType::Dividend.is_trade());
}

#[test]
fn test_validate_normalizes_symbol_currency_and_notes() {
    let mut input = new_buy();
    input.validate("usd").unwrap();
    assert_eq!(input.symbol.as_deref(), Some("AAPL"));
    assert_eq!(input.currency.as_deref(), Some("USD"));
    assert_eq!(input.notes, None);
}

#[test]
fn test_validate_rejects_bad_numbers() {
    let mut zero = new_buy();
    zero.quantity = dec!(0);
    assert_eq!(zero.validate("USD").unwrap_err().code(), "VALIDATION_ERROR");

    let mut zero_sell = new_buy();
    zero_sell.transaction_type = TransactionType::Sell;
    zero_sell.quantity = dec!(0);
    assert!(zero_sell.validate("USD").is_err());

    let mut negative_price = new_buy();
    negative_price.price = Some(dec!(-1));
    assert!(negative_price.validate("USD").is_err());

    let mut negative_commission = new_buy();
    negative_commission.commission = dec!(-0.01);
    assert!(negative_commission.validate("USD").is_err());
}

#[test]
fn test_cash_rows_accept_zero_quantity() {
    for transaction_type in [
        TransactionType::Dividend,
        TransactionType::Deposit,
        TransactionType::Withdrawal,
        TransactionType::Fee,
    ] {
        let mut cash = NewTransaction {
            transaction_type,
            symbol: None,
            quantity: dec!(0),
            price: None,
            commission: dec!(0),
            ..new_buy()
        };
        cash.validate("USD").unwrap();
        assert_eq!(cash.quantity, dec!(0));
    }

    let mut negative = NewTransaction {
        transaction_type: TransactionType::Deposit,
        symbol: None,
        quantity: dec!(-5),
        price: None,
        ..new_buy()
    };
    assert_eq!(negative.validate("USD").unwrap_err().code(), "VALIDATION_ERROR");
}

#[test]
fn test_trades_need_price_and_symbol() {
    let mut no_price = new_buy();
    no_price.price = None;
    assert!(no_price.validate("USD").is_err());

    let mut no_symbol = new_buy();
    no_symbol.symbol = None;
    assert!(no_symbol.validate("USD").is_err());

    let mut deposit = new_buy();
    deposit.transaction_type = TransactionType::Deposit;
    deposit.symbol = None;
    deposit.price = None;
    deposit.validate("EUR").unwrap();
    assert_eq!(deposit.currency.as_deref(), Some("EUR"));
}

#[test]
fn test_lot_selections_only_on_sells() {
    let mut input = new_buy();
    input.lot_selections = Some(vec![LotSelection {
        lot_id: "b1".to_string(),
        quantity: dec!(1),
    }]);
    assert!(input.validate("USD").is_err());
}

#[test]
fn test_check_lot_selections_follows_method() {
    let selections = [LotSelection {
        lot_id: "b1".to_string(),
        quantity: dec!(1),
    }];
    assert!(check_lot_selections(CostBasisMethod::SpecificLot, TransactionType::Sell, Some(&selections)).is_ok());
    assert!(check_lot_selections(CostBasisMethod::SpecificLot, TransactionType::Sell, None).is_err());
    assert!(check_lot_selections(CostBasisMethod::SpecificLot, TransactionType::Buy, None).is_ok());
    assert!(check_lot_selections(CostBasisMethod::Fifo, TransactionType::Sell, Some(&selections)).is_err());
    assert!(check_lot_selections(CostBasisMethod::Lifo, TransactionType::Sell, None).is_ok());
}

#[test]
fn test_amount_and_cash_effect() {
    let buy_tx = with_commission(buy("b1", "AAPL", d(2024, 1, 2), dec!(10), dec!(100)), dec!(5));
    assert_eq!(buy_tx.amount(), dec!(1000));
    assert_eq!(buy_tx.cash_effect(), dec!(-1005));

    let sell_tx = with_commission(sell("s1", "AAPL", d(2024, 1, 3), dec!(4), dec!(110)), dec!(2));
    assert_eq!(sell_tx.cash_effect(), dec!(438));

    let deposit = cash("d1", TransactionType::Deposit, d(2024, 1, 1), dec!(500));
    assert_eq!(deposit.amount(), dec!(500));
    assert_eq!(deposit.external_flow(), dec!(500));
    assert_eq!(buy_tx.external_flow(), dec!(0));

    let withdrawal = cash("w1", TransactionType::Withdrawal, d(2024, 1, 1), dec!(200));
    assert_eq!(withdrawal.external_flow(), dec!(-200));
    assert_eq!(withdrawal.cash_effect(), dec!(-200));
}

#[test]
fn test_event_order_breaks_ties_by_created_at_then_id() {
    let mut first = buy("b2", "AAPL", d(2024, 1, 2), dec!(1), dec!(1));
    let mut second = buy("b1", "AAPL", d(2024, 1, 2), dec!(1), dec!(1));
    first.created_at = ts(1);
    second.created_at = ts(2);
    let third = buy("a0", "AAPL", d(2024, 1, 3), dec!(1), dec!(1));

    let mut log = vec![third.clone(), second.clone(), first.clone()];
    sort_in_event_order(&mut log);
    let ids: Vec<&str> = log.iter().map(|tx| tx.id.as_str()).collect();
    assert_eq!(ids, vec!["b2", "b1", "a0"]);

    second.created_at = ts(1);
    assert!(second.event_cmp(&first).is_lt());
}

#[test]
fn test_next_created_at_is_strictly_increasing() {
    assert_eq!(next_created_at(None, ts(5)), ts(5));
    assert_eq!(next_created_at(Some(ts(1)), ts(5)), ts(5));
    assert!(next_created_at(Some(ts(5)), ts(5)) > ts(5));
    assert!(next_created_at(Some(ts(9)), ts(5)) > ts(9));
}

#[test]
fn test_update_keeps_identity_and_creation_stamp() {
    let mut existing = buy("b1", "AAPL", d(2024, 1, 2), dec!(10), dec!(100));
    existing.import_batch_id = Some("batch".to_string());
    let update = TransactionUpdate {
        id: "b1".to_string(),
        transaction_type: TransactionType::Buy,
        symbol: Some("msft".to_string()),
        date: d(2024, 1, 5),
        quantity: dec!(3),
        price: Some(dec!(300)),
        commission: dec!(0),
        currency: None,
        notes: None,
        lot_selections: None,
    };
    let updated = update.apply_to(&existing, "USD", ts(50)).unwrap();
    assert_eq!(updated.id, "b1");
    assert_eq!(updated.symbol.as_deref(), Some("MSFT"));
    assert_eq!(updated.created_at, existing.created_at);
    assert_eq!(updated.updated_at, ts(50));
    assert_eq!(updated.import_batch_id.as_deref(), Some("batch"));
}

#[test]
fn test_filter_matches_and_validates_range() {
    let tx1 = buy("b1", "AAPL", d(2024, 1, 2), dec!(1), dec!(1));
    let filter = TransactionFilter {
        symbol: Some("AAPL".to_string()),
        start_date: Some(d(2024, 1, 1)),
        end_date: Some(d(2024, 1, 31)),
        transaction_types: Some(vec![TransactionType::Buy]),
    };
    assert!(filter.matches(&tx1));
    assert!(!TransactionFilter::for_symbol("MSFT").matches(&tx1));

    let mut inverted = TransactionFilter {
        start_date: Some(d(2024, 2, 1)),
        end_date: Some(d(2024, 1, 1)),
        ..TransactionFilter::default()
    };
    assert_eq!(inverted.validate().unwrap_err().code(), "INVALID_DATE_RANGE");
}

#[test]
fn test_fingerprint_ignores_identity() {
    let a = buy("b1", "AAPL", d(2024, 1, 2), dec!(10), dec!(100));
    let mut b = buy("b2", "AAPL", d(2024, 1, 2), dec!(10.0), dec!(100.00));
    b.created_at = ts(99);
    assert_eq!(a.fingerprint(), b.fingerprint());

    let c = buy("b3", "AAPL", d(2024, 1, 3), dec!(10), dec!(100));
    assert_ne!(a.fingerprint(), c.fingerprint());
}
