use std::sync::Arc;

use crate::db::MemoryDb;
use foliotrack_core::errors::Result;
use foliotrack_core::imports::{ImportBatch, ImportBatchRepositoryTrait};

pub struct ImportBatchRepository {
    db: Arc<MemoryDb>,
}

impl ImportBatchRepository {
    pub fn new(db: Arc<MemoryDb>) -> Self {
        Self { db }
    }
}

impl ImportBatchRepositoryTrait for ImportBatchRepository {
    fn get_by_id(&self, batch_id: &str) -> Result<Option<ImportBatch>> {
        self.db
            .read(|state| state.import_batch(batch_id).cloned())
    }

    fn list(&self, portfolio_id: &str) -> Result<Vec<ImportBatch>> {
        let mut batches = self.db.read(|state| {
            state
                .portfolio(portfolio_id)
                .map(|p| p.import_batches.values().cloned().collect::<Vec<_>>())
                .unwrap_or_default()
        })?;
        batches.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(batches)
    }
}
