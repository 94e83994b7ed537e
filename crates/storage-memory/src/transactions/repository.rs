use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::db::MemoryDb;
use foliotrack_core::errors::Result;
use foliotrack_core::transactions::{
    Transaction, TransactionFilter, TransactionRepositoryTrait,
};

pub struct TransactionRepository {
    db: Arc<MemoryDb>,
}

impl TransactionRepository {
    pub fn new(db: Arc<MemoryDb>) -> Self {
        Self { db }
    }

    fn collect(&self, keep: impl Fn(&Transaction) -> bool) -> Result<Vec<Transaction>> {
        let mut rows = self.db.read(|state| {
            state
                .partitions()
                .flat_map(|p| p.transactions.values())
                .filter(|tx| keep(tx))
                .cloned()
                .collect::<Vec<_>>()
        })?;
        rows.sort_by(|a, b| a.event_cmp(b));
        Ok(rows)
    }
}

impl TransactionRepositoryTrait for TransactionRepository {
    fn get_by_id(&self, transaction_id: &str) -> Result<Option<Transaction>> {
        self.db
            .read(|state| state.transaction(transaction_id).cloned())
    }

    fn list(&self, portfolio_id: &str, filter: &TransactionFilter) -> Result<Vec<Transaction>> {
        let mut rows = self.db.read(|state| {
            state
                .portfolio(portfolio_id)
                .map(|p| {
                    p.transactions
                        .values()
                        .filter(|tx| filter.matches(tx))
                        .cloned()
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default()
        })?;
        rows.sort_by(|a, b| a.event_cmp(b));
        Ok(rows)
    }

    fn list_by_batch(&self, batch_id: &str) -> Result<Vec<Transaction>> {
        self.collect(|tx| tx.import_batch_id.as_deref() == Some(batch_id))
    }

    fn latest_created_at(&self, portfolio_id: &str) -> Result<Option<DateTime<Utc>>> {
        self.db.read(|state| {
            state
                .portfolio(portfolio_id)
                .and_then(|p| p.transactions.values().map(|tx| tx.created_at).max())
        })
    }
}
