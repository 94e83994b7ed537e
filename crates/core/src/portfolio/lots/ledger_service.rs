use log::debug;
use std::collections::HashSet;
use std::sync::Arc;

use super::ledger::TaxLotLedger;
use super::lots_model::{DerivedState, RealizedGain, TaxLot};
use super::lots_traits::LedgerRepositoryTrait;
use crate::corporate_actions::{ActionApplication, ActionStatus, CorporateActionRepositoryTrait};
use crate::errors::{Error, NotFoundError, Result};
use crate::event_store::{EventLog, EventStoreTrait, LedgerEvent, PortfolioWrite};
use crate::events::{DomainEvent, DomainEventSink, NoOpDomainEventSink};
use crate::portfolios::{Portfolio, PortfolioRepositoryTrait};
use crate::transactions::{TransactionFilter, TransactionRepositoryTrait, TransactionType};

/// Loads event logs, replays them, and persists derived ledger state.
pub struct LedgerService {
    portfolio_repository: Arc<dyn PortfolioRepositoryTrait>,
    transaction_repository: Arc<dyn TransactionRepositoryTrait>,
    corporate_action_repository: Arc<dyn CorporateActionRepositoryTrait>,
    ledger_repository: Arc<dyn LedgerRepositoryTrait>,
    event_store: Arc<dyn EventStoreTrait>,
    event_sink: Arc<dyn DomainEventSink>,
}

impl LedgerService {
    pub fn new(
        portfolio_repository: Arc<dyn PortfolioRepositoryTrait>,
        transaction_repository: Arc<dyn TransactionRepositoryTrait>,
        corporate_action_repository: Arc<dyn CorporateActionRepositoryTrait>,
        ledger_repository: Arc<dyn LedgerRepositoryTrait>,
        event_store: Arc<dyn EventStoreTrait>,
    ) -> Self {
        Self {
            portfolio_repository,
            transaction_repository,
            corporate_action_repository,
            ledger_repository,
            event_store,
            event_sink: Arc::new(NoOpDomainEventSink),
        }
    }

    /// Sets the domain event sink for this service.
    pub fn with_event_sink(mut self, event_sink: Arc<dyn DomainEventSink>) -> Self {
        self.event_sink = event_sink;
        self
    }

    /// Reads the portfolio row as committed.
    ///
    /// Writers call this after taking the portfolio's write lock and use the
    /// result for method and currency; the row returned by `authorize` was
    /// read before the lock and may predate a concurrent update.
    pub fn locked_portfolio(&self, portfolio_id: &str) -> Result<Portfolio> {
        self.portfolio_repository
            .get_by_id(portfolio_id)?
            .ok_or_else(|| NotFoundError::Portfolio(portfolio_id.to_string()).into())
    }

    /// Loads the portfolio's transactions and APPLIED corporate actions.
    pub fn load_event_log(&self, portfolio_id: &str) -> Result<EventLog> {
        let transactions = self
            .transaction_repository
            .list(portfolio_id, &TransactionFilter::default())?;
        let applications = self.load_applications(portfolio_id)?;
        Ok(EventLog {
            transactions,
            applications,
        })
    }

    pub fn load_applications(&self, portfolio_id: &str) -> Result<Vec<ActionApplication>> {
        let actions = self
            .corporate_action_repository
            .list_portfolio_actions(portfolio_id, Some(ActionStatus::Applied))?;
        actions
            .into_iter()
            .map(|action| {
                let corporate_action = self
                    .corporate_action_repository
                    .get_by_id(&action.corporate_action_id)?
                    .ok_or_else(|| {
                        Error::Unexpected(format!(
                            "portfolio action {} references missing corporate action {}",
                            action.id, action.corporate_action_id
                        ))
                    })?;
                Ok(ActionApplication {
                    action,
                    corporate_action,
                })
            })
            .collect()
    }

    /// Replays a log for a portfolio. Pure; nothing is written.
    pub fn derive(portfolio: &Portfolio, log: &EventLog) -> Result<DerivedState> {
        let events: Vec<LedgerEvent<'_>> = log.events();
        let state = TaxLotLedger::replay(&portfolio.id, portfolio.cost_basis_method, &events)?;
        debug!(
            "Replayed {} event(s) for portfolio {}: {} open lot(s), {} gain row(s)",
            events.len(),
            portfolio.id,
            state.lots.len(),
            state.realized_gains.len()
        );
        Ok(state)
    }

    /// Rebuilds and stores the portfolio's derived state from its full log.
    /// The caller holds the portfolio's write lock.
    pub fn rederive(&self, portfolio: &Portfolio) -> Result<DerivedState> {
        let log = self.load_event_log(&portfolio.id)?;
        let state = Self::derive(portfolio, &log)?;
        self.event_store
            .commit(PortfolioWrite::new(&portfolio.id).with_derived(state.clone()))?;
        self.event_sink
            .emit(DomainEvent::ledger_rederived(portfolio.id.clone(), None));
        Ok(state)
    }

    pub fn list_lots(&self, portfolio_id: &str, symbol: Option<&str>) -> Result<Vec<TaxLot>> {
        self.ledger_repository.list_lots(portfolio_id, symbol)
    }

    /// Gains of sales that are still in the log.
    pub fn list_realized_gains(&self, portfolio_id: &str) -> Result<Vec<RealizedGain>> {
        let live_sales: HashSet<String> = self
            .transaction_repository
            .list(
                portfolio_id,
                &TransactionFilter {
                    transaction_types: Some(vec![TransactionType::Sell]),
                    ..TransactionFilter::default()
                },
            )?
            .into_iter()
            .map(|tx| tx.id)
            .collect();
        Ok(self
            .ledger_repository
            .list_realized_gains(portfolio_id)?
            .into_iter()
            .filter(|gain| live_sales.contains(&gain.sale_transaction_id))
            .collect())
    }

    /// Every stored gain, including history of deleted sales.
    pub fn list_gain_history(&self, portfolio_id: &str) -> Result<Vec<RealizedGain>> {
        self.ledger_repository.list_realized_gains(portfolio_id)
    }
}
