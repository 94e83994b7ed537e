use super::holdings_model::Holding;
use crate::errors::Result;

/// Stored holdings projection with its staleness flag.
///
/// [`crate::event_store::EventStoreTrait::commit`] marks a portfolio's
/// holdings stale whenever it replaces the lots.
pub trait HoldingsRepositoryTrait: Send + Sync {
    fn list_holdings(&self, portfolio_id: &str) -> Result<Vec<Holding>>;

    fn holdings_stale(&self, portfolio_id: &str) -> Result<bool>;

    /// Replaces the portfolio's holdings and clears the staleness flag.
    fn save_holdings(&self, portfolio_id: &str, holdings: Vec<Holding>) -> Result<()>;
}
