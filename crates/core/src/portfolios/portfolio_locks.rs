//! Per-portfolio reader/writer locks.

use dashmap::DashMap;
use std::sync::{Arc, RwLock};

use crate::errors::{DatabaseError, Result};

/// Registry of one lock per portfolio.
///
/// Every write touching a portfolio (event append/update/delete, action
/// application, import commit) runs inside [`PortfolioLocks::with_write`] for
/// the whole write plus re-derivation. Reads run under the shared side.
/// Locks of different portfolios never interact.
#[derive(Default)]
pub struct PortfolioLocks {
    locks: DashMap<String, Arc<RwLock<()>>>,
}

impl PortfolioLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, portfolio_id: &str) -> Arc<RwLock<()>> {
        // Clone the Arc out so the map shard is released before blocking.
        self.locks
            .entry(portfolio_id.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(())))
            .value()
            .clone()
    }

    /// Runs `f` while holding the portfolio's exclusive lock.
    pub fn with_write<T>(&self, portfolio_id: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let lock = self.lock_for(portfolio_id);
        let _guard = lock.write().map_err(|e| {
            DatabaseError::Internal(format!("portfolio lock {} poisoned: {}", portfolio_id, e))
        })?;
        f()
    }

    /// Runs `f` while holding the portfolio's shared lock.
    pub fn with_read<T>(&self, portfolio_id: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let lock = self.lock_for(portfolio_id);
        let _guard = lock.read().map_err(|e| {
            DatabaseError::Internal(format!("portfolio lock {} poisoned: {}", portfolio_id, e))
        })?;
        f()
    }

    /// Forgets the lock of a deleted portfolio.
    pub fn remove(&self, portfolio_id: &str) {
        self.locks.remove(portfolio_id);
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
