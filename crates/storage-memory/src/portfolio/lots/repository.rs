use std::sync::Arc;

use crate::db::MemoryDb;
use foliotrack_core::errors::Result;
use foliotrack_core::portfolio::lots::{LedgerRepositoryTrait, RealizedGain, TaxLot};

pub struct LedgerRepository {
    db: Arc<MemoryDb>,
}

impl LedgerRepository {
    pub fn new(db: Arc<MemoryDb>) -> Self {
        Self { db }
    }
}

impl LedgerRepositoryTrait for LedgerRepository {
    fn list_lots(&self, portfolio_id: &str, symbol: Option<&str>) -> Result<Vec<TaxLot>> {
        let mut lots = self.db.read(|state| {
            state
                .portfolio(portfolio_id)
                .map(|p| {
                    p.lots
                        .iter()
                        .filter(|lot| symbol.map_or(true, |s| lot.symbol == s))
                        .cloned()
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default()
        })?;
        lots.sort_by(|a, b| a.symbol.cmp(&b.symbol).then_with(|| a.fifo_cmp(b)));
        Ok(lots)
    }

    fn list_realized_gains(&self, portfolio_id: &str) -> Result<Vec<RealizedGain>> {
        self.db.read(|state| {
            state
                .portfolio(portfolio_id)
                .map(|p| p.realized_gains.clone())
                .unwrap_or_default()
        })
    }
}
