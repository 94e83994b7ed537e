use chrono::Utc;
use log::{debug, error, info, warn};
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

use super::corporate_actions_model::{
    ActionApplication, ActionStatus, ApprovalResult, CorporateAction, CorporateActionType,
    NewCorporateAction, PortfolioAction,
};
use super::corporate_actions_traits::{CorporateActionRepositoryTrait, CorporateActionServiceTrait};
use super::detector::detect_pending_actions;
use crate::constants::SYNTHETIC_DIVIDEND_PREFIX;
use crate::context::RequestContext;
use crate::errors::{NotFoundError, Result};
use crate::event_store::{EventLog, EventStoreTrait, LedgerEvent, PortfolioWrite};
use crate::events::{DomainEvent, DomainEventSink, NoOpDomainEventSink};
use crate::portfolio::lots::{LedgerService, TaxLotLedger};
use crate::portfolios::{Portfolio, PortfolioLocks, PortfolioServiceTrait};
use crate::transactions::{next_created_at, Transaction, TransactionRepositoryTrait, TransactionType};
use crate::utils::validation::normalize_symbol;

/// Service driving the corporate-action review workflow.
pub struct CorporateActionService {
    portfolio_service: Arc<dyn PortfolioServiceTrait>,
    repository: Arc<dyn CorporateActionRepositoryTrait>,
    transaction_repository: Arc<dyn TransactionRepositoryTrait>,
    ledger_service: Arc<LedgerService>,
    event_store: Arc<dyn EventStoreTrait>,
    locks: Arc<PortfolioLocks>,
    event_sink: Arc<dyn DomainEventSink>,
}

impl CorporateActionService {
    pub fn new(
        portfolio_service: Arc<dyn PortfolioServiceTrait>,
        repository: Arc<dyn CorporateActionRepositoryTrait>,
        transaction_repository: Arc<dyn TransactionRepositoryTrait>,
        ledger_service: Arc<LedgerService>,
        event_store: Arc<dyn EventStoreTrait>,
        locks: Arc<PortfolioLocks>,
    ) -> Self {
        Self {
            portfolio_service,
            repository,
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

    fn load_action(&self, action_id: &str) -> Result<PortfolioAction> {
        self.repository
            .get_portfolio_action(action_id)?
            .ok_or_else(|| NotFoundError::Action(action_id.to_string()).into())
    }

    fn load_corporate_action(&self, corporate_action_id: &str) -> Result<CorporateAction> {
        self.repository
            .get_by_id(corporate_action_id)?
            .ok_or_else(|| NotFoundError::CorporateAction(corporate_action_id.to_string()).into())
    }

    /// Loads an action and its portfolio, checking the caller owns it.
    fn authorize_action(
        &self,
        ctx: &RequestContext,
        action_id: &str,
    ) -> Result<(PortfolioAction, Portfolio)> {
        let action = self.load_action(action_id)?;
        let portfolio = self.portfolio_service.authorize(ctx, &action.portfolio_id)?;
        Ok((action, portfolio))
    }

    /// Applies an APPROVED action: replays the log with the action included
    /// and commits the APPLIED status with the new derived state in one write.
    /// The caller holds the portfolio's write lock and passes the portfolio
    /// as read under it.
    fn apply_locked(
        &self,
        ctx: &RequestContext,
        portfolio: &Portfolio,
        action: &PortfolioAction,
    ) -> Result<PortfolioAction> {
        let corporate_action = self.load_corporate_action(&action.corporate_action_id)?;
        let now = Utc::now();
        let applied = action.mark_applied(now)?;

        let mut log = self.ledger_service.load_event_log(&portfolio.id)?;
        let application = ActionApplication {
            action: applied.clone(),
            corporate_action,
        };
        let mut write = PortfolioWrite::new(&portfolio.id);

        if application.corporate_action.action_type == CorporateActionType::Dividend {
            if let Some(dividend) = self.synthetic_dividend(portfolio, &log, &application)? {
                debug!(
                    "Recording dividend {} of {} for action {}",
                    dividend.id, dividend.quantity, action.id
                );
                log.transactions.push(dividend.clone());
                write = write.insert_transaction(dividend);
            }
        }

        ctx.deadline.check("corporate action application")?;
        log.applications.push(application);
        let state = LedgerService::derive(portfolio, &log)?;
        self.event_store
            .commit(write.upsert_action(applied.clone()).with_derived(state))?;

        info!(
            "Applied corporate action {} to portfolio {}",
            applied.corporate_action_id, portfolio.id
        );
        self.event_sink.emit(DomainEvent::corporate_action_applied(
            portfolio.id.clone(),
            applied.id.clone(),
            applied.corporate_action_id.clone(),
        ));
        Ok(applied)
    }

    /// Builds the cash DIVIDEND for `amount × shares held` just before the
    /// action. Nothing is recorded when no shares are held or the row exists.
    fn synthetic_dividend(
        &self,
        portfolio: &Portfolio,
        log: &EventLog,
        application: &ActionApplication,
    ) -> Result<Option<Transaction>> {
        let id = format!("{}-{}", SYNTHETIC_DIVIDEND_PREFIX, application.action.id);
        if log.transactions.iter().any(|tx| tx.id == id) {
            return Ok(None);
        }

        let corporate_action = &application.corporate_action;
        let marker = LedgerEvent::CorporateAction(application);
        let mut ledger = TaxLotLedger::new(&portfolio.id, portfolio.cost_basis_method);
        for event in log.events() {
            if event.log_cmp(&marker).is_ge() {
                break;
            }
            ledger.apply(&event)?;
        }

        let shares = ledger.open_quantity(&corporate_action.symbol);
        if shares <= Decimal::ZERO {
            warn!(
                "No {} shares held in portfolio {} on {}; dividend action {} records nothing",
                corporate_action.symbol, portfolio.id, corporate_action.date, application.action.id
            );
            return Ok(None);
        }

        let created_at = next_created_at(
            self.transaction_repository.latest_created_at(&portfolio.id)?,
            Utc::now(),
        );
        Ok(Some(Transaction {
            id,
            portfolio_id: portfolio.id.clone(),
            transaction_type: TransactionType::Dividend,
            symbol: Some(corporate_action.symbol.clone()),
            date: corporate_action.date,
            quantity: shares,
            price: corporate_action.amount,
            commission: Decimal::ZERO,
            currency: corporate_action
                .currency
                .clone()
                .unwrap_or_else(|| portfolio.base_currency.clone()),
            notes: Some(format!("Corporate action {}", corporate_action.id)),
            import_batch_id: None,
            lot_selections: None,
            created_at,
            updated_at: created_at,
        }))
    }
}

impl CorporateActionServiceTrait for CorporateActionService {
    fn create_corporate_action(&self, mut new_action: NewCorporateAction) -> Result<CorporateAction> {
        new_action.validate()?;
        let id = new_action
            .id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let corporate_action = new_action.into_corporate_action(id, Utc::now());
        debug!(
            "Registering {:?} for {} on {}",
            corporate_action.action_type, corporate_action.symbol, corporate_action.date
        );
        self.repository.create(corporate_action)
    }

    fn list_corporate_actions(&self, symbol: Option<&str>) -> Result<Vec<CorporateAction>> {
        match symbol {
            Some(symbol) => self.repository.list(Some(&normalize_symbol(symbol)?)),
            None => self.repository.list(None),
        }
    }

    fn detect_actions(
        &self,
        ctx: &RequestContext,
        portfolio_id: &str,
    ) -> Result<Vec<PortfolioAction>> {
        let portfolio = self.portfolio_service.authorize(ctx, portfolio_id)?;
        self.locks.with_write(&portfolio.id, || {
            let lots = self.ledger_service.list_lots(&portfolio.id, None)?;
            let existing = self.repository.list_portfolio_actions(&portfolio.id, None)?;
            let corporate_actions = self.repository.list(None)?;

            let detected = detect_pending_actions(
                &portfolio.id,
                &lots,
                &corporate_actions,
                &existing,
                Utc::now(),
                || Uuid::new_v4().to_string(),
            );
            if detected.is_empty() {
                return Ok(detected);
            }

            let write = detected
                .iter()
                .cloned()
                .fold(PortfolioWrite::new(&portfolio.id), PortfolioWrite::upsert_action);
            self.event_store.commit(write)?;
            info!(
                "Detected {} pending corporate action(s) for portfolio {}",
                detected.len(),
                portfolio.id
            );
            Ok(detected)
        })
    }

    fn list_actions(
        &self,
        ctx: &RequestContext,
        portfolio_id: &str,
        status: Option<ActionStatus>,
    ) -> Result<Vec<PortfolioAction>> {
        let portfolio = self.portfolio_service.authorize(ctx, portfolio_id)?;
        self.locks.with_read(&portfolio.id, || {
            self.repository.list_portfolio_actions(&portfolio.id, status)
        })
    }

    fn get_action(&self, ctx: &RequestContext, action_id: &str) -> Result<PortfolioAction> {
        let (action, _) = self.authorize_action(ctx, action_id)?;
        Ok(action)
    }

    fn approve_action(
        &self,
        ctx: &RequestContext,
        action_id: &str,
        notes: Option<String>,
    ) -> Result<ApprovalResult> {
        let (_, owned) = self.authorize_action(ctx, action_id)?;
        self.locks.with_write(&owned.id, || {
            let portfolio = self.ledger_service.locked_portfolio(&owned.id)?;
            let current = self.load_action(action_id)?;
            let approved = current.approve(&ctx.principal_id, notes, Utc::now())?;
            self.event_store
                .commit(PortfolioWrite::new(&portfolio.id).upsert_action(approved.clone()))?;

            match self.apply_locked(ctx, &portfolio, &approved) {
                Ok(applied) => Ok(ApprovalResult {
                    action: applied,
                    applied: true,
                    application_error: None,
                }),
                Err(err) => {
                    error!(
                        "Applying approved action {} to portfolio {} failed: {}",
                        approved.id, portfolio.id, err
                    );
                    Ok(ApprovalResult {
                        action: approved,
                        applied: false,
                        application_error: Some(err.to_response()),
                    })
                }
            }
        })
    }

    fn reject_action(
        &self,
        ctx: &RequestContext,
        action_id: &str,
        reason: Option<String>,
    ) -> Result<PortfolioAction> {
        let (_, portfolio) = self.authorize_action(ctx, action_id)?;
        self.locks.with_write(&portfolio.id, || {
            let current = self.load_action(action_id)?;
            let rejected = current.reject(&ctx.principal_id, reason, Utc::now())?;
            self.event_store
                .commit(PortfolioWrite::new(&portfolio.id).upsert_action(rejected.clone()))?;
            Ok(rejected)
        })
    }

    fn retry_apply(&self, ctx: &RequestContext, action_id: &str) -> Result<PortfolioAction> {
        let (_, owned) = self.authorize_action(ctx, action_id)?;
        self.locks.with_write(&owned.id, || {
            let portfolio = self.ledger_service.locked_portfolio(&owned.id)?;
            let current = self.load_action(action_id)?;
            if current.status == ActionStatus::Applied {
                debug!("Action {} is already applied", current.id);
                return Ok(current);
            }
            self.apply_locked(ctx, &portfolio, &current)
        })
    }
}
