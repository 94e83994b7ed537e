use std::sync::Arc;

use crate::db::MemoryDb;
use foliotrack_core::errors::Result;
use foliotrack_core::portfolio::holdings::{Holding, HoldingsRepositoryTrait};

pub struct HoldingsRepository {
    db: Arc<MemoryDb>,
}

impl HoldingsRepository {
    pub fn new(db: Arc<MemoryDb>) -> Self {
        Self { db }
    }
}

impl HoldingsRepositoryTrait for HoldingsRepository {
    fn list_holdings(&self, portfolio_id: &str) -> Result<Vec<Holding>> {
        self.db
            .read(|state| {
                state
                    .portfolio(portfolio_id)
                    .and_then(|p| p.holdings.clone())
                    .unwrap_or_default()
            })
    }

    /// Holdings that were never saved count as stale.
    fn holdings_stale(&self, portfolio_id: &str) -> Result<bool> {
        self.db.read(|state| {
            state
                .portfolio(portfolio_id)
                .map_or(true, |p| p.holdings_stale || p.holdings.is_none())
        })
    }

    fn save_holdings(&self, portfolio_id: &str, holdings: Vec<Holding>) -> Result<()> {
        self.db.write(|state| {
            let partition = state.require_portfolio_mut(portfolio_id)?;
            partition.holdings = Some(holdings);
            partition.holdings_stale = false;
            Ok(())
        })
    }
}
