//! Derived ledger state repository.

use super::lots_model::{RealizedGain, TaxLot};
use crate::errors::Result;

/// Read side of the derived ledger state. Writes arrive through
/// [`crate::event_store::EventStoreTrait::commit`].
pub trait LedgerRepositoryTrait: Send + Sync {
    /// Open lots in `(symbol, purchase_date, created_at, id)` order.
    fn list_lots(&self, portfolio_id: &str, symbol: Option<&str>) -> Result<Vec<TaxLot>>;

    /// Every stored gain, including those of sales that were later deleted.
    fn list_realized_gains(&self, portfolio_id: &str) -> Result<Vec<RealizedGain>>;
}
