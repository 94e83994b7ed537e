use chrono::{NaiveDate, Utc};
use log::debug;
use std::sync::Arc;
use uuid::Uuid;

use super::transactions_model::{
    check_lot_selections, next_created_at, NewTransaction, Transaction, TransactionFilter,
    TransactionUpdate,
};
use super::transactions_traits::{TransactionRepositoryTrait, TransactionServiceTrait};
use crate::context::RequestContext;
use crate::errors::{Error, NotFoundError, Result};
use crate::event_store::{EventStoreTrait, PortfolioWrite};
use crate::events::{DomainEvent, DomainEventSink, NoOpDomainEventSink};
use crate::portfolio::lots::LedgerService;
use crate::portfolios::{Portfolio, PortfolioLocks, PortfolioServiceTrait};

/// Service for appending to and editing a portfolio's event log.
///
/// Every mutation replays the full log with the change applied before
/// anything is written; a failing replay rejects the mutation.
pub struct TransactionService {
    portfolio_service: Arc<dyn PortfolioServiceTrait>,
    repository: Arc<dyn TransactionRepositoryTrait>,
    ledger_service: Arc<LedgerService>,
    event_store: Arc<dyn EventStoreTrait>,
    locks: Arc<PortfolioLocks>,
    event_sink: Arc<dyn DomainEventSink>,
}

impl TransactionService {
    pub fn new(
        portfolio_service: Arc<dyn PortfolioServiceTrait>,
        repository: Arc<dyn TransactionRepositoryTrait>,
        ledger_service: Arc<LedgerService>,
        event_store: Arc<dyn EventStoreTrait>,
        locks: Arc<PortfolioLocks>,
    ) -> Self {
        Self {
            portfolio_service,
            repository,
            ledger_service,
            event_store,
            locks,
            event_sink: Arc::new(NoOpDomainEventSink),
        }
    }

    /// Sets the domain event sink for this service.
    pub fn with_event_sink(mut self, event_sink: Arc<dyn DomainEventSink>) -> Self {
        self.event_sink = event_sink;
        self
    }

    fn load_transaction(&self, transaction_id: &str) -> Result<Transaction> {
        self.repository
            .get_by_id(transaction_id)?
            .ok_or_else(|| NotFoundError::Transaction(transaction_id.to_string()).into())
    }

    /// Loads a transaction and its portfolio, checking the caller owns it.
    fn authorize_transaction(
        &self,
        ctx: &RequestContext,
        transaction_id: &str,
    ) -> Result<(Transaction, Portfolio)> {
        let transaction = self.load_transaction(transaction_id)?;
        let portfolio = self
            .portfolio_service
            .authorize(ctx, &transaction.portfolio_id)?;
        Ok((transaction, portfolio))
    }

    /// Replays the log with `edit` applied and commits `write` with the
    /// resulting derived state. The caller holds the portfolio's write lock.
    fn replay_and_commit(
        &self,
        ctx: &RequestContext,
        portfolio: &Portfolio,
        edit: impl FnOnce(&mut Vec<Transaction>),
        write: PortfolioWrite,
    ) -> Result<()> {
        let mut log = self.ledger_service.load_event_log(&portfolio.id)?;
        edit(&mut log.transactions);
        ctx.deadline.check("ledger replay")?;
        let state = LedgerService::derive(portfolio, &log)?;
        self.event_store.commit(write.with_derived(state))
    }

    fn emit_changed(&self, portfolio_id: &str, changed: &[&Transaction], from_date: NaiveDate) {
        let mut symbols: Vec<String> = changed
            .iter()
            .filter_map(|tx| tx.symbol.clone())
            .collect();
        symbols.sort();
        symbols.dedup();
        self.event_sink.emit_batch(vec![
            DomainEvent::transactions_changed(
                portfolio_id.to_string(),
                changed.iter().map(|tx| tx.id.clone()).collect(),
                symbols,
            ),
            DomainEvent::ledger_rederived(portfolio_id.to_string(), Some(from_date)),
        ]);
    }
}

impl TransactionServiceTrait for TransactionService {
    fn create_transaction(
        &self,
        ctx: &RequestContext,
        portfolio_id: &str,
        mut new_transaction: NewTransaction,
    ) -> Result<Transaction> {
        let owned = self.portfolio_service.authorize(ctx, portfolio_id)?;

        self.locks.with_write(&owned.id, || {
            let portfolio = self.ledger_service.locked_portfolio(&owned.id)?;
            new_transaction.validate(&portfolio.base_currency)?;
            check_lot_selections(
                portfolio.cost_basis_method,
                new_transaction.transaction_type,
                new_transaction.lot_selections.as_deref(),
            )?;

            let id = new_transaction
                .id
                .take()
                .unwrap_or_else(|| Uuid::new_v4().to_string());
            if self.repository.get_by_id(&id)?.is_some() {
                return Err(Error::invalid_input(format!(
                    "Transaction id {} already exists",
                    id
                )));
            }
            let created_at = next_created_at(
                self.repository.latest_created_at(&portfolio.id)?,
                Utc::now(),
            );
            let transaction = new_transaction.into_transaction(id, &portfolio.id, None, created_at);

            let appended = transaction.clone();
            self.replay_and_commit(
                ctx,
                &portfolio,
                |log| log.push(appended),
                PortfolioWrite::new(&portfolio.id).insert_transaction(transaction.clone()),
            )?;

            debug!(
                "Created {} {} in portfolio {}",
                transaction.transaction_type, transaction.id, portfolio.id
            );
            self.emit_changed(&portfolio.id, &[&transaction], transaction.date);
            Ok(transaction)
        })
    }

    fn update_transaction(
        &self,
        ctx: &RequestContext,
        update: TransactionUpdate,
    ) -> Result<Transaction> {
        let (_, owned) = self.authorize_transaction(ctx, &update.id)?;

        self.locks.with_write(&owned.id, || {
            let portfolio = self.ledger_service.locked_portfolio(&owned.id)?;
            let existing = self.load_transaction(&update.id)?;
            let updated = update.apply_to(&existing, &portfolio.base_currency, Utc::now())?;
            check_lot_selections(
                portfolio.cost_basis_method,
                updated.transaction_type,
                updated.lot_selections.as_deref(),
            )?;

            let replacement = updated.clone();
            self.replay_and_commit(
                ctx,
                &portfolio,
                |log| {
                    if let Some(slot) = log.iter_mut().find(|tx| tx.id == replacement.id) {
                        *slot = replacement;
                    }
                },
                PortfolioWrite::new(&portfolio.id).update_transaction(updated.clone()),
            )?;

            debug!("Updated transaction {} in portfolio {}", updated.id, portfolio.id);
            self.emit_changed(
                &portfolio.id,
                &[&existing, &updated],
                existing.date.min(updated.date),
            );
            Ok(updated)
        })
    }

    fn delete_transaction(&self, ctx: &RequestContext, transaction_id: &str) -> Result<Transaction> {
        let (_, owned) = self.authorize_transaction(ctx, transaction_id)?;

        self.locks.with_write(&owned.id, || {
            let portfolio = self.ledger_service.locked_portfolio(&owned.id)?;
            let existing = self.load_transaction(transaction_id)?;
            self.replay_and_commit(
                ctx,
                &portfolio,
                |log| log.retain(|tx| tx.id != existing.id),
                PortfolioWrite::new(&portfolio.id).delete_transaction(&existing.id),
            )?;

            debug!("Deleted transaction {} from portfolio {}", existing.id, portfolio.id);
            self.emit_changed(&portfolio.id, &[&existing], existing.date);
            Ok(existing)
        })
    }

    fn get_transaction(&self, ctx: &RequestContext, transaction_id: &str) -> Result<Transaction> {
        let (transaction, _) = self.authorize_transaction(ctx, transaction_id)?;
        Ok(transaction)
    }

    fn list_transactions(
        &self,
        ctx: &RequestContext,
        portfolio_id: &str,
        mut filter: TransactionFilter,
    ) -> Result<Vec<Transaction>> {
        let portfolio = self.portfolio_service.authorize(ctx, portfolio_id)?;
        filter.validate()?;
        self.locks
            .with_read(&portfolio.id, || self.repository.list(&portfolio.id, &filter))
    }
}
