//! Transaction repository and service traits.

use chrono::{DateTime, Utc};

use super::transactions_model::{NewTransaction, Transaction, TransactionFilter, TransactionUpdate};
use crate::context::RequestContext;
use crate::errors::Result;

/// Read side of the event store for transactions.
///
/// Writes go through [`crate::event_store::EventStoreTrait::commit`] so that an
/// event change and its re-derived state land together.
pub trait TransactionRepositoryTrait: Send + Sync {
    fn get_by_id(&self, transaction_id: &str) -> Result<Option<Transaction>>;

    /// Lists a portfolio's transactions in `(date, created_at, id)` order.
    fn list(&self, portfolio_id: &str, filter: &TransactionFilter) -> Result<Vec<Transaction>>;

    /// Lists the transactions tagged with an import batch.
    fn list_by_batch(&self, batch_id: &str) -> Result<Vec<Transaction>>;

    /// Largest `created_at` stamped on the portfolio's transactions.
    fn latest_created_at(&self, portfolio_id: &str) -> Result<Option<DateTime<Utc>>>;
}

/// Trait defining the contract for Transaction service operations.
pub trait TransactionServiceTrait: Send + Sync {
    /// Appends one transaction and re-derives the ledger.
    ///
    /// Fails with `INSUFFICIENT_SHARES` (and writes nothing) when a SELL
    /// exceeds the open quantity at its date.
    fn create_transaction(
        &self,
        ctx: &RequestContext,
        portfolio_id: &str,
        new_transaction: NewTransaction,
    ) -> Result<Transaction>;

    /// Replaces a transaction's fields and re-derives everything downstream.
    fn update_transaction(&self, ctx: &RequestContext, update: TransactionUpdate)
        -> Result<Transaction>;

    /// Deletes a transaction and re-derives everything downstream.
    fn delete_transaction(&self, ctx: &RequestContext, transaction_id: &str) -> Result<Transaction>;

    fn get_transaction(&self, ctx: &RequestContext, transaction_id: &str) -> Result<Transaction>;

    fn list_transactions(
        &self,
        ctx: &RequestContext,
        portfolio_id: &str,
        filter: TransactionFilter,
    ) -> Result<Vec<Transaction>>;
}
