//! Duplicate-detection fingerprints for transactions.
//!
//! Import rows carry no stable upstream id, so duplicates are matched on the
//! transaction's semantic content instead.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};

use super::transactions_model::TransactionType;

/// Computes a stable fingerprint for a transaction.
///
/// The key is a SHA-256 hash of:
/// - portfolio_id
/// - transaction type
/// - symbol (if present)
/// - date
/// - quantity and price for trades, the cash amount for cash operations
/// - currency
///
/// Cash operations hash their amount so that a dividend recorded as
/// `quantity × price-per-share` matches the same dividend recorded as a bare
/// total.
pub fn compute_fingerprint(
    portfolio_id: &str,
    transaction_type: TransactionType,
    symbol: Option<&str>,
    date: NaiveDate,
    quantity: Decimal,
    price: Option<Decimal>,
    currency: &str,
) -> String {
    let mut hasher = Sha256::new();

    hasher.update(portfolio_id.as_bytes());
    hasher.update(b"|");
    hasher.update(transaction_type.as_str().as_bytes());
    hasher.update(b"|");
    if let Some(symbol) = symbol {
        hasher.update(symbol.as_bytes());
    }
    hasher.update(b"|");
    hasher.update(date.format("%Y-%m-%d").to_string().as_bytes());
    hasher.update(b"|");

    if transaction_type.is_trade() {
        hasher.update(normalize_decimal(quantity).as_bytes());
        hasher.update(b"|");
        if let Some(price) = price {
            hasher.update(normalize_decimal(price).as_bytes());
        }
    } else {
        let amount = match price {
            Some(price) => quantity * price,
            None => quantity,
        };
        hasher.update(normalize_decimal(amount).as_bytes());
    }
    hasher.update(b"|");
    hasher.update(currency.as_bytes());

    hex::encode(hasher.finalize())
}

/// Strips trailing zeros so `10`, `10.0` and `10.000` hash identically.
fn normalize_decimal(value: Decimal) -> String {
    value.normalize().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    #[test]
    fn test_fingerprint_ignores_scale() {
        let a = compute_fingerprint("p1", TransactionType::Buy, Some("AAPL"), day(), dec!(10), Some(dec!(100)), "USD");
        let b = compute_fingerprint("p1", TransactionType::Buy, Some("AAPL"), day(), dec!(10.000), Some(dec!(100.0)), "USD");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_fingerprint_distinguishes_fields() {
        let base = compute_fingerprint("p1", TransactionType::Buy, Some("AAPL"), day(), dec!(10), Some(dec!(100)), "USD");
        let other_portfolio = compute_fingerprint("p2", TransactionType::Buy, Some("AAPL"), day(), dec!(10), Some(dec!(100)), "USD");
        let other_type = compute_fingerprint("p1", TransactionType::Sell, Some("AAPL"), day(), dec!(10), Some(dec!(100)), "USD");
        let other_price = compute_fingerprint("p1", TransactionType::Buy, Some("AAPL"), day(), dec!(10), Some(dec!(101)), "USD");
        assert_ne!(base, other_portfolio);
        assert_ne!(base, other_type);
        assert_ne!(base, other_price);
    }

    #[test]
    fn test_cash_operations_match_on_amount() {
        let per_share = compute_fingerprint("p1", TransactionType::Dividend, Some("AAPL"), day(), dec!(100), Some(dec!(0.24)), "USD");
        let total = compute_fingerprint("p1", TransactionType::Dividend, Some("AAPL"), day(), dec!(24), None, "USD");
        assert_eq!(per_share, total);
    }
}
