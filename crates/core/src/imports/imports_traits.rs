use super::imports_model::{ImportBatch, ImportRequest, ImportResult};
use crate::context::RequestContext;
use crate::errors::Result;

/// Read side of import batches. Batches are written through
/// [`crate::event_store::EventStoreTrait::commit`] together with their rows.
pub trait ImportBatchRepositoryTrait: Send + Sync {
    fn get_by_id(&self, batch_id: &str) -> Result<Option<ImportBatch>>;

    /// A portfolio's batches, newest first.
    fn list(&self, portfolio_id: &str) -> Result<Vec<ImportBatch>>;
}

pub trait ImportServiceTrait: Send + Sync {
    /// Validates, de-duplicates and simulates every row, then commits per
    /// the request's policy in a single write.
    fn import_transactions(
        &self,
        ctx: &RequestContext,
        portfolio_id: &str,
        request: ImportRequest,
    ) -> Result<ImportResult>;

    /// Same row checks as an import; never writes.
    fn check_import(
        &self,
        ctx: &RequestContext,
        portfolio_id: &str,
        request: ImportRequest,
    ) -> Result<ImportResult>;

    /// Removes every transaction of the batch and re-derives the ledger.
    /// Returns the number of deleted transactions.
    fn delete_batch(&self, ctx: &RequestContext, portfolio_id: &str, batch_id: &str)
        -> Result<usize>;

    fn list_batches(&self, ctx: &RequestContext, portfolio_id: &str) -> Result<Vec<ImportBatch>>;
}
