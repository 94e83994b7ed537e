use super::event_store_model::PortfolioWrite;
use crate::errors::Result;

/// Atomic writer for everything a portfolio owns.
pub trait EventStoreTrait: Send + Sync {
    /// Applies the whole write or nothing.
    ///
    /// When `write.derived` is present the portfolio's open lots are replaced,
    /// realized gains of live sales are replaced (gains of deleted sales are
    /// kept as history) and holdings are marked stale.
    fn commit(&self, write: PortfolioWrite) -> Result<()>;
}
