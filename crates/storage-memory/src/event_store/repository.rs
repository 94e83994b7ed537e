use log::debug;
use std::collections::HashSet;
use std::sync::Arc;

use crate::db::{MemoryDb, PortfolioState, StoreState};
use crate::errors::StorageError;
use foliotrack_core::errors::Result;
use foliotrack_core::event_store::{EventStoreTrait, PortfolioWrite};
use foliotrack_core::portfolio::lots::DerivedState;
use foliotrack_core::transactions::TransactionType;

/// Applies [`PortfolioWrite`]s to the store, all or nothing.
pub struct EventStore {
    db: Arc<MemoryDb>,
}

impl EventStore {
    pub fn new(db: Arc<MemoryDb>) -> Self {
        Self { db }
    }
}

fn owned_by(portfolio_id: &str, owner: &str, what: &str, id: &str) -> std::result::Result<(), StorageError> {
    if owner != portfolio_id {
        return Err(StorageError::ForeignKeyViolation(format!(
            "{} {} belongs to portfolio {}, not {}",
            what, id, owner, portfolio_id
        )));
    }
    Ok(())
}

fn replace_derived(partition: &mut PortfolioState, derived: DerivedState) {
    let live_sales: HashSet<&str> = partition
        .transactions
        .values()
        .filter(|tx| tx.transaction_type == TransactionType::Sell)
        .map(|tx| tx.id.as_str())
        .collect();
    partition
        .realized_gains
        .retain(|gain| !live_sales.contains(gain.sale_transaction_id.as_str()));
    partition.realized_gains.extend(derived.realized_gains);
    partition.lots = derived.lots;
    partition.holdings_stale = true;
}

fn apply(state: &mut StoreState, write: PortfolioWrite) -> std::result::Result<(), StorageError> {
    let pid = write.portfolio_id.as_str();
    if !state.portfolios.contains_key(pid) {
        return Err(StorageError::ForeignKeyViolation(format!("portfolios.id {}", pid)));
    }

    for tx in &write.insert_transactions {
        owned_by(pid, &tx.portfolio_id, "transaction", &tx.id)?;
        if state.transaction(&tx.id).is_some() {
            return Err(StorageError::UniqueViolation(format!("transactions.id {}", tx.id)));
        }
    }
    for action in &write.upsert_actions {
        owned_by(pid, &action.portfolio_id, "portfolio action", &action.id)?;
        if !state
            .corporate_actions
            .contains_key(&action.corporate_action_id)
        {
            return Err(StorageError::ForeignKeyViolation(format!(
                "corporate_actions.id {}",
                action.corporate_action_id
            )));
        }
    }

    let partition = state.require_portfolio_mut(pid)?;
    for tx in write.insert_transactions {
        partition.transactions.insert(tx.id.clone(), tx);
    }
    for tx in write.update_transactions {
        owned_by(pid, &tx.portfolio_id, "transaction", &tx.id)?;
        match partition.transactions.get_mut(&tx.id) {
            Some(row) => *row = tx,
            None => return Err(StorageError::MissingRow(format!("transactions.id {}", tx.id))),
        }
    }
    for id in write.delete_transaction_ids {
        if partition.transactions.remove(&id).is_none() {
            return Err(StorageError::MissingRow(format!("transactions.id {}", id)));
        }
    }
    for action in write.upsert_actions {
        partition.actions.insert(action.id.clone(), action);
    }
    if let Some(batch_id) = write.delete_batch_id {
        if partition.import_batches.remove(&batch_id).is_none() {
            return Err(StorageError::MissingRow(format!("import_batches.id {}", batch_id)));
        }
    }
    if let Some(batch) = write.upsert_batch {
        owned_by(pid, &batch.portfolio_id, "import batch", &batch.id)?;
        partition.import_batches.insert(batch.id.clone(), batch);
    }
    if let Some(derived) = write.derived {
        replace_derived(partition, derived);
    }
    Ok(())
}

impl EventStoreTrait for EventStore {
    fn commit(&self, write: PortfolioWrite) -> Result<()> {
        if write.is_empty() {
            return Ok(());
        }
        debug!(
            "Committing portfolio {}: +{} ~{} -{} transaction(s), {} action(s), derived: {}",
            write.portfolio_id,
            write.insert_transactions.len(),
            write.update_transactions.len(),
            write.delete_transaction_ids.len(),
            write.upsert_actions.len(),
            write.derived.is_some()
        );
        self.db.write(|state| apply(state, write))
    }
}
