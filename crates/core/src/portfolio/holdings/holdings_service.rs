use log::debug;
use std::sync::Arc;

use super::holdings_calculator::project_holdings;
use super::holdings_model::{Holding, HoldingsSummary, ValuedHolding};
use super::holdings_traits::HoldingsRepositoryTrait;
use super::holdings_valuation_service::HoldingsValuationService;
use crate::context::RequestContext;
use crate::errors::{Error, NotFoundError, Result};
use crate::portfolio::lots::LedgerService;
use crate::portfolios::{PortfolioLocks, PortfolioServiceTrait};
use crate::utils::validation::normalize_symbol;

pub trait HoldingsServiceTrait: Send + Sync {
    /// The portfolio's holdings ordered by symbol, rebuilt from the lots
    /// first when they are stale.
    fn get_holdings(&self, ctx: &RequestContext, portfolio_id: &str) -> Result<Vec<Holding>>;

    /// One holding; `HOLDING_NOT_FOUND` when the symbol has no open lots.
    fn get_holding(&self, ctx: &RequestContext, portfolio_id: &str, symbol: &str)
        -> Result<Holding>;

    /// Holdings priced with the latest quotes, with base-currency totals.
    fn get_valued_holdings(&self, ctx: &RequestContext, portfolio_id: &str)
        -> Result<HoldingsSummary>;

    fn get_valued_holding(
        &self,
        ctx: &RequestContext,
        portfolio_id: &str,
        symbol: &str,
    ) -> Result<ValuedHolding>;
}

pub struct HoldingsService {
    portfolio_service: Arc<dyn PortfolioServiceTrait>,
    repository: Arc<dyn HoldingsRepositoryTrait>,
    ledger_service: Arc<LedgerService>,
    valuation_service: Arc<HoldingsValuationService>,
    locks: Arc<PortfolioLocks>,
}

impl HoldingsService {
    pub fn new(
        portfolio_service: Arc<dyn PortfolioServiceTrait>,
        repository: Arc<dyn HoldingsRepositoryTrait>,
        ledger_service: Arc<LedgerService>,
        valuation_service: Arc<HoldingsValuationService>,
        locks: Arc<PortfolioLocks>,
    ) -> Self {
        Self {
            portfolio_service,
            repository,
            ledger_service,
            valuation_service,
            locks,
        }
    }

    /// Returns stored holdings, rebuilding them from the lots when stale.
    /// The caller holds the portfolio's lock.
    pub(crate) fn load_fresh(&self, portfolio_id: &str) -> Result<Vec<Holding>> {
        if !self.repository.holdings_stale(portfolio_id)? {
            return self.repository.list_holdings(portfolio_id);
        }
        let lots = self.ledger_service.list_lots(portfolio_id, None)?;
        let holdings = project_holdings(portfolio_id, &lots);
        debug!(
            "Rebuilt {} holding(s) of portfolio {} from {} lot(s)",
            holdings.len(),
            portfolio_id,
            lots.len()
        );
        self.repository
            .save_holdings(portfolio_id, holdings.clone())?;
        Ok(holdings)
    }

    fn find_holding(&self, portfolio_id: &str, symbol: &str) -> Result<Holding> {
        let symbol = normalize_symbol(symbol)?;
        self.load_fresh(portfolio_id)?
            .into_iter()
            .find(|holding| holding.symbol == symbol)
            .ok_or_else(|| {
                Error::from(NotFoundError::Holding {
                    portfolio_id: portfolio_id.to_string(),
                    symbol,
                })
            })
    }
}

impl HoldingsServiceTrait for HoldingsService {
    fn get_holdings(&self, ctx: &RequestContext, portfolio_id: &str) -> Result<Vec<Holding>> {
        let portfolio = self.portfolio_service.authorize(ctx, portfolio_id)?;
        self.locks
            .with_read(&portfolio.id, || self.load_fresh(&portfolio.id))
    }

    fn get_holding(
        &self,
        ctx: &RequestContext,
        portfolio_id: &str,
        symbol: &str,
    ) -> Result<Holding> {
        let portfolio = self.portfolio_service.authorize(ctx, portfolio_id)?;
        self.locks
            .with_read(&portfolio.id, || self.find_holding(&portfolio.id, symbol))
    }

    fn get_valued_holdings(
        &self,
        ctx: &RequestContext,
        portfolio_id: &str,
    ) -> Result<HoldingsSummary> {
        let portfolio = self.portfolio_service.authorize(ctx, portfolio_id)?;
        let holdings = self
            .locks
            .with_read(&portfolio.id, || self.load_fresh(&portfolio.id))?;
        // Quotes are fetched outside the portfolio lock.
        Ok(self
            .valuation_service
            .summarize(&portfolio.id, holdings, &portfolio.base_currency))
    }

    fn get_valued_holding(
        &self,
        ctx: &RequestContext,
        portfolio_id: &str,
        symbol: &str,
    ) -> Result<ValuedHolding> {
        let portfolio = self.portfolio_service.authorize(ctx, portfolio_id)?;
        let holding = self
            .locks
            .with_read(&portfolio.id, || self.find_holding(&portfolio.id, symbol))?;
        Ok(self
            .valuation_service
            .value_holding(holding, &portfolio.base_currency))
    }
}
