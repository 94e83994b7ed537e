use chrono::{DateTime, NaiveDate, Utc};
use log::{debug, info, warn};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;

use super::imports_model::{
    CommitPolicy, ImportBatch, ImportRequest, ImportResult, ImportRowResult,
};
use super::imports_traits::{ImportBatchRepositoryTrait, ImportServiceTrait};
use crate::context::RequestContext;
use crate::errors::{Error, NotFoundError, Result, ValidationError};
use crate::event_store::{EventLog, EventStoreTrait, PortfolioWrite};
use crate::events::{DomainEvent, DomainEventSink, NoOpDomainEventSink};
use crate::portfolio::lots::{DerivedState, LedgerService, TaxLotLedger};
use crate::portfolios::{Portfolio, PortfolioLocks, PortfolioServiceTrait};
use crate::transactions::{
    check_lot_selections, next_created_at, NewTransaction, Transaction, TransactionRepositoryTrait,
};
use crate::utils::validation::require_non_empty;

/// Rows checked against the current log, ready to commit.
struct StagedImport {
    batch_id: String,
    rows: Vec<ImportRowResult>,
    accepted: Vec<Transaction>,
    /// Derived state with every accepted row applied.
    state: Option<DerivedState>,
}

impl StagedImport {
    fn success_count(&self) -> usize {
        self.accepted.len()
    }

    fn failure_count(&self) -> usize {
        self.rows.len() - self.accepted.len()
    }

    fn into_result(self, committed: bool) -> ImportResult {
        let success_count = self.success_count();
        let failure_count = self.failure_count();
        ImportResult {
            batch_id: self.batch_id,
            committed,
            success_count,
            failure_count,
            rows: self.rows,
        }
    }
}

/// Ledger over the stored log plus the rows accepted so far. A row ordered
/// after every known event is applied in place; a back-dated row replays the
/// whole log with it included.
struct StagingLedger<'a> {
    portfolio: &'a Portfolio,
    base_log: &'a EventLog,
    ledger: TaxLotLedger,
    last_transaction: Option<Transaction>,
    last_action_date: Option<NaiveDate>,
}

impl<'a> StagingLedger<'a> {
    fn new(portfolio: &'a Portfolio, base_log: &'a EventLog) -> Result<Self> {
        let ledger = TaxLotLedger::from_events(
            &portfolio.id,
            portfolio.cost_basis_method,
            &base_log.events(),
        )?;
        Ok(Self {
            portfolio,
            base_log,
            ledger,
            last_transaction: base_log
                .transactions
                .iter()
                .max_by(|a, b| a.event_cmp(b))
                .cloned(),
            last_action_date: base_log
                .applications
                .iter()
                .map(|app| app.corporate_action.date)
                .max(),
        })
    }

    /// Whether `transaction` sorts after every event seen so far. Actions
    /// follow transactions on the same date, so their date must be earlier.
    fn follows_log(&self, transaction: &Transaction) -> bool {
        self.last_action_date
            .map_or(true, |date| transaction.date > date)
            && self
                .last_transaction
                .as_ref()
                .map_or(true, |last| transaction.event_cmp(last).is_gt())
    }

    /// Adds one row on top of `accepted`. The ledger is unchanged on error.
    fn stage(&mut self, transaction: &Transaction, accepted: &[Transaction]) -> Result<()> {
        if self.follows_log(transaction) {
            self.ledger.apply_transaction(transaction)?;
        } else {
            let mut log = self.base_log.clone();
            log.transactions.extend(accepted.iter().cloned());
            log.transactions.push(transaction.clone());
            debug!(
                "Row {} is back-dated to {}; replaying {} event(s)",
                transaction.id,
                transaction.date,
                log.transactions.len() + log.applications.len()
            );
            self.ledger = TaxLotLedger::from_events(
                &self.portfolio.id,
                self.portfolio.cost_basis_method,
                &log.events(),
            )?;
        }

        let is_latest = self
            .last_transaction
            .as_ref()
            .map_or(true, |last| transaction.event_cmp(last).is_gt());
        if is_latest {
            self.last_transaction = Some(transaction.clone());
        }
        Ok(())
    }

    fn into_state(self) -> DerivedState {
        self.ledger.into_state()
    }
}

/// Service orchestrating bulk imports into a portfolio's event log.
pub struct ImportService {
    portfolio_service: Arc<dyn PortfolioServiceTrait>,
    batch_repository: Arc<dyn ImportBatchRepositoryTrait>,
    transaction_repository: Arc<dyn TransactionRepositoryTrait>,
    ledger_service: Arc<LedgerService>,
    event_store: Arc<dyn EventStoreTrait>,
    locks: Arc<PortfolioLocks>,
    event_sink: Arc<dyn DomainEventSink>,
}

impl ImportService {
    pub fn new(
        portfolio_service: Arc<dyn PortfolioServiceTrait>,
        batch_repository: Arc<dyn ImportBatchRepositoryTrait>,
        transaction_repository: Arc<dyn TransactionRepositoryTrait>,
        ledger_service: Arc<LedgerService>,
        event_store: Arc<dyn EventStoreTrait>,
        locks: Arc<PortfolioLocks>,
    ) -> Self {
        Self {
            portfolio_service,
            batch_repository,
            transaction_repository,
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

    /// Checks every row in order: field validation, duplicate fingerprint
    /// against the log and earlier rows, then the ledger with all previously
    /// accepted rows plus this one. The caller holds the portfolio's lock.
    fn stage(
        &self,
        ctx: &RequestContext,
        portfolio: &Portfolio,
        request: ImportRequest,
    ) -> Result<StagedImport> {
        let batch_id = request
            .batch_id
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        if self.batch_repository.get_by_id(&batch_id)?.is_some() {
            return Err(Error::invalid_input(format!(
                "Import batch {} already exists",
                batch_id
            )));
        }

        let base_log = self.ledger_service.load_event_log(&portfolio.id)?;
        let mut fingerprints: HashMap<String, String> = base_log
            .transactions
            .iter()
            .map(|tx| (tx.fingerprint(), tx.id.clone()))
            .collect();
        let mut known_ids: HashSet<String> =
            base_log.transactions.iter().map(|tx| tx.id.clone()).collect();
        let mut ledger = StagingLedger::new(portfolio, &base_log)?;
        let mut created_at = next_created_at(
            self.transaction_repository.latest_created_at(&portfolio.id)?,
            Utc::now(),
        );

        let mut staged = StagedImport {
            batch_id,
            rows: Vec::with_capacity(request.records.len()),
            accepted: Vec::new(),
            state: None,
        };

        for (index, record) in request.records.into_iter().enumerate() {
            ctx.deadline.check("import staging")?;
            let row = index + 1;
            let outcome = self
                .prepare_row(portfolio, &known_ids, &fingerprints, record, &staged.batch_id, created_at)
                .and_then(|transaction| {
                    ledger.stage(&transaction, &staged.accepted)?;
                    Ok(transaction)
                });
            match outcome {
                Ok(transaction) => {
                    fingerprints.insert(transaction.fingerprint(), transaction.id.clone());
                    known_ids.insert(transaction.id.clone());
                    created_at = next_created_at(Some(created_at), Utc::now());
                    staged.rows.push(ImportRowResult {
                        row,
                        transaction_id: Some(transaction.id.clone()),
                        error: None,
                    });
                    staged.accepted.push(transaction);
                }
                Err(err) => {
                    debug!("Import row {} rejected: {}", row, err);
                    staged.rows.push(ImportRowResult {
                        row,
                        transaction_id: None,
                        error: Some(err.to_response()),
                    });
                }
            }
        }

        if !staged.accepted.is_empty() {
            staged.state = Some(ledger.into_state());
        }
        Ok(staged)
    }

    /// Validates one record and turns it into a transaction of the batch.
    fn prepare_row(
        &self,
        portfolio: &Portfolio,
        known_ids: &HashSet<String>,
        fingerprints: &HashMap<String, String>,
        mut record: NewTransaction,
        batch_id: &str,
        created_at: DateTime<Utc>,
    ) -> Result<Transaction> {
        record.validate(&portfolio.base_currency)?;
        check_lot_selections(
            portfolio.cost_basis_method,
            record.transaction_type,
            record.lot_selections.as_deref(),
        )?;

        let id = match record.id.take() {
            Some(id) => {
                require_non_empty(&id, "id")?;
                if known_ids.contains(&id) || self.transaction_repository.get_by_id(&id)?.is_some() {
                    return Err(Error::invalid_input(format!(
                        "Transaction id {} already exists",
                        id
                    )));
                }
                id
            }
            None => Uuid::new_v4().to_string(),
        };
        let transaction =
            record.into_transaction(id, &portfolio.id, Some(batch_id.to_string()), created_at);

        if let Some(existing) = fingerprints.get(&transaction.fingerprint()) {
            return Err(ValidationError::DuplicateTransaction(existing.clone()).into());
        }
        Ok(transaction)
    }

    fn commit_staged(&self, portfolio: &Portfolio, source: &str, staged: StagedImport) -> Result<ImportResult> {
        let Some(state) = staged.state.clone() else {
            return Ok(staged.into_result(false));
        };

        let batch = ImportBatch {
            id: staged.batch_id.clone(),
            portfolio_id: portfolio.id.clone(),
            source: source.to_string(),
            created_at: Utc::now(),
            success_count: staged.success_count(),
            failure_count: staged.failure_count(),
        };
        let write = staged
            .accepted
            .iter()
            .cloned()
            .fold(PortfolioWrite::new(&portfolio.id), PortfolioWrite::insert_transaction)
            .upsert_batch(batch.clone())
            .with_derived(state);
        self.event_store.commit(write)?;

        info!(
            "Imported batch {} into portfolio {}: {} row(s) committed, {} rejected",
            batch.id, portfolio.id, batch.success_count, batch.failure_count
        );
        let mut symbols: Vec<String> = staged
            .accepted
            .iter()
            .filter_map(|tx| tx.symbol.clone())
            .collect();
        symbols.sort();
        symbols.dedup();
        let from_date = staged.accepted.iter().map(|tx| tx.date).min();
        self.event_sink.emit_batch(vec![
            DomainEvent::transactions_changed(
                portfolio.id.clone(),
                staged.accepted.iter().map(|tx| tx.id.clone()).collect(),
                symbols,
            ),
            DomainEvent::ledger_rederived(portfolio.id.clone(), from_date),
            DomainEvent::import_committed(
                portfolio.id.clone(),
                batch.id.clone(),
                batch.success_count,
                batch.failure_count,
            ),
        ]);
        Ok(staged.into_result(true))
    }
}

impl ImportServiceTrait for ImportService {
    fn import_transactions(
        &self,
        ctx: &RequestContext,
        portfolio_id: &str,
        request: ImportRequest,
    ) -> Result<ImportResult> {
        let owned = self.portfolio_service.authorize(ctx, portfolio_id)?;
        let policy = request.policy;
        let source = request.source.clone();

        self.locks.with_write(&owned.id, || {
            let portfolio = self.ledger_service.locked_portfolio(&owned.id)?;
            let staged = self.stage(ctx, &portfolio, request)?;
            let all_valid = staged.failure_count() == 0;
            match policy {
                CommitPolicy::AllOrNothing if !all_valid => {
                    warn!(
                        "Import into portfolio {} rejected: {} of {} row(s) failed",
                        portfolio.id,
                        staged.failure_count(),
                        staged.rows.len()
                    );
                    Ok(staged.into_result(false))
                }
                CommitPolicy::AllOrNothing | CommitPolicy::ValidRowsOnly => {
                    self.commit_staged(&portfolio, &source, staged)
                }
            }
        })
    }

    fn check_import(
        &self,
        ctx: &RequestContext,
        portfolio_id: &str,
        request: ImportRequest,
    ) -> Result<ImportResult> {
        let owned = self.portfolio_service.authorize(ctx, portfolio_id)?;
        self.locks.with_read(&owned.id, || {
            let portfolio = self.ledger_service.locked_portfolio(&owned.id)?;
            let staged = self.stage(ctx, &portfolio, request)?;
            Ok(staged.into_result(false))
        })
    }

    fn delete_batch(
        &self,
        ctx: &RequestContext,
        portfolio_id: &str,
        batch_id: &str,
    ) -> Result<usize> {
        let owned = self.portfolio_service.authorize(ctx, portfolio_id)?;
        self.locks.with_write(&owned.id, || {
            let portfolio = self.ledger_service.locked_portfolio(&owned.id)?;
            let batch = self
                .batch_repository
                .get_by_id(batch_id)?
                .filter(|batch| batch.portfolio_id == portfolio.id)
                .ok_or_else(|| Error::from(NotFoundError::Batch(batch_id.to_string())))?;

            let tagged = self.transaction_repository.list_by_batch(&batch.id)?;
            let mut log = self.ledger_service.load_event_log(&portfolio.id)?;
            log.transactions
                .retain(|tx| tx.import_batch_id.as_deref() != Some(batch.id.as_str()));
            ctx.deadline.check("ledger replay")?;
            let state = LedgerService::derive(&portfolio, &log)?;

            let write = tagged
                .iter()
                .fold(PortfolioWrite::new(&portfolio.id), |write, tx| {
                    write.delete_transaction(&tx.id)
                })
                .delete_batch(&batch.id)
                .with_derived(state);
            self.event_store.commit(write)?;

            info!(
                "Deleted import batch {} ({} transaction(s)) from portfolio {}",
                batch.id,
                tagged.len(),
                portfolio.id
            );
            let from_date = tagged.iter().map(|tx| tx.date).min();
            self.event_sink.emit_batch(vec![
                DomainEvent::transactions_changed(
                    portfolio.id.clone(),
                    tagged.iter().map(|tx| tx.id.clone()).collect(),
                    Vec::new(),
                ),
                DomainEvent::ledger_rederived(portfolio.id.clone(), from_date),
            ]);
            Ok(tagged.len())
        })
    }

    fn list_batches(&self, ctx: &RequestContext, portfolio_id: &str) -> Result<Vec<ImportBatch>> {
        let portfolio = self.portfolio_service.authorize(ctx, portfolio_id)?;
        self.batch_repository.list(&portfolio.id)
    }
}
