use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::market_data_model::Quote;
use crate::errors::Result;

/// Capability for reading market prices and exchange rates.
///
/// Calls are idempotent within a request; callers never rely on stability
/// across requests. Blocking I/O is allowed behind this boundary.
pub trait PriceOracle: Send + Sync {
    /// Latest available quote for a symbol.
    fn quote(&self, symbol: &str) -> Result<Quote>;

    /// Daily closes for `symbol` between `from` and `to` inclusive, ascending.
    /// Days without trading are simply absent.
    fn historical(&self, symbol: &str, from: NaiveDate, to: NaiveDate) -> Result<Vec<Quote>>;

    /// Rate converting one unit of `from` into `to` on `date`.
    fn fx(&self, from: &str, to: &str, date: NaiveDate) -> Result<Decimal>;
}
