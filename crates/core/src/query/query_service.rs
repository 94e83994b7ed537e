use log::debug;
use rust_decimal::Decimal;
use std::sync::Arc;

use super::query_model::{GainQuery, PortfolioOverview, RealizedGainTotals};
use crate::context::RequestContext;
use crate::errors::Result;
use crate::portfolio::holdings::{HoldingsServiceTrait, HoldingsSummary};
use crate::portfolio::lots::{sort_lots_for_method, LedgerService, RealizedGain, TaxLot};
use crate::portfolio::performance::{PerformanceMetrics, PerformanceRange, PerformanceServiceTrait};
use crate::portfolio::snapshot::SnapshotRepositoryTrait;
use crate::portfolio::tax::{HarvestReport, TaxServiceTrait};
use crate::portfolios::{PortfolioLocks, PortfolioServiceTrait};
use crate::utils::validation::normalize_symbol;

/// Every read is checked against the caller's ownership of the portfolio
/// before any row is loaded.
pub trait PortfolioQueryServiceTrait: Send + Sync {
    fn overview(&self, ctx: &RequestContext, portfolio_id: &str) -> Result<PortfolioOverview>;

    fn holdings(&self, ctx: &RequestContext, portfolio_id: &str) -> Result<HoldingsSummary>;

    /// Open lots in the order the portfolio's method would sell them.
    fn tax_lots(
        &self,
        ctx: &RequestContext,
        portfolio_id: &str,
        symbol: Option<&str>,
    ) -> Result<Vec<TaxLot>>;

    /// Gains of live sales, by sale date.
    fn realized_gains(
        &self,
        ctx: &RequestContext,
        portfolio_id: &str,
        query: &GainQuery,
    ) -> Result<Vec<RealizedGain>>;

    fn harvest_opportunities(
        &self,
        ctx: &RequestContext,
        portfolio_id: &str,
        threshold_pct: Option<Decimal>,
    ) -> Result<HarvestReport>;

    fn metrics(
        &self,
        ctx: &RequestContext,
        portfolio_id: &str,
        range: PerformanceRange,
    ) -> Result<PerformanceMetrics>;
}

pub struct PortfolioQueryService {
    portfolio_service: Arc<dyn PortfolioServiceTrait>,
    ledger_service: Arc<LedgerService>,
    holdings_service: Arc<dyn HoldingsServiceTrait>,
    tax_service: Arc<dyn TaxServiceTrait>,
    performance_service: Arc<dyn PerformanceServiceTrait>,
    snapshot_repository: Arc<dyn SnapshotRepositoryTrait>,
    locks: Arc<PortfolioLocks>,
}

impl PortfolioQueryService {
    pub fn new(
        portfolio_service: Arc<dyn PortfolioServiceTrait>,
        ledger_service: Arc<LedgerService>,
        holdings_service: Arc<dyn HoldingsServiceTrait>,
        tax_service: Arc<dyn TaxServiceTrait>,
        performance_service: Arc<dyn PerformanceServiceTrait>,
        snapshot_repository: Arc<dyn SnapshotRepositoryTrait>,
        locks: Arc<PortfolioLocks>,
    ) -> Self {
        Self {
            portfolio_service,
            ledger_service,
            holdings_service,
            tax_service,
            performance_service,
            snapshot_repository,
            locks,
        }
    }

    fn live_gains(&self, portfolio_id: &str, query: &GainQuery) -> Result<Vec<RealizedGain>> {
        let mut gains: Vec<RealizedGain> = self
            .ledger_service
            .list_realized_gains(portfolio_id)?
            .into_iter()
            .filter(|gain| query.matches(gain))
            .collect();
        gains.sort_by(|a, b| a.sale_date.cmp(&b.sale_date).then_with(|| a.id.cmp(&b.id)));
        Ok(gains)
    }
}

impl PortfolioQueryServiceTrait for PortfolioQueryService {
    fn overview(&self, ctx: &RequestContext, portfolio_id: &str) -> Result<PortfolioOverview> {
        let portfolio = self.portfolio_service.authorize(ctx, portfolio_id)?;
        let (open_lot_count, gains, latest_snapshot) = self.locks.with_read(&portfolio.id, || {
            let open_lots = self
                .ledger_service
                .list_lots(&portfolio.id, None)?
                .iter()
                .filter(|lot| lot.is_open())
                .count();
            let gains = self.live_gains(&portfolio.id, &GainQuery::default())?;
            let latest = self.snapshot_repository.list(&portfolio.id, 1, 0)?.into_iter().next();
            Ok((open_lots, gains, latest))
        })?;
        let holdings = self.holdings_service.get_valued_holdings(ctx, &portfolio.id)?;
        debug!(
            "Overview of portfolio {}: {} holding(s), {} open lot(s), {} gain row(s)",
            portfolio.id,
            holdings.holdings.len(),
            open_lot_count,
            gains.len()
        );
        Ok(PortfolioOverview {
            portfolio,
            holdings,
            open_lot_count,
            realized: RealizedGainTotals::from_gains(&gains),
            latest_snapshot,
        })
    }

    fn holdings(&self, ctx: &RequestContext, portfolio_id: &str) -> Result<HoldingsSummary> {
        self.holdings_service.get_valued_holdings(ctx, portfolio_id)
    }

    fn tax_lots(
        &self,
        ctx: &RequestContext,
        portfolio_id: &str,
        symbol: Option<&str>,
    ) -> Result<Vec<TaxLot>> {
        let portfolio = self.portfolio_service.authorize(ctx, portfolio_id)?;
        let symbol = symbol.map(normalize_symbol).transpose()?;
        let mut lots: Vec<TaxLot> = self
            .locks
            .with_read(&portfolio.id, || {
                self.ledger_service.list_lots(&portfolio.id, symbol.as_deref())
            })?
            .into_iter()
            .filter(|lot| lot.is_open())
            .collect();
        sort_lots_for_method(&mut lots, portfolio.cost_basis_method);
        Ok(lots)
    }

    fn realized_gains(
        &self,
        ctx: &RequestContext,
        portfolio_id: &str,
        query: &GainQuery,
    ) -> Result<Vec<RealizedGain>> {
        let portfolio = self.portfolio_service.authorize(ctx, portfolio_id)?;
        let query = GainQuery {
            symbol: query.symbol.as_deref().map(normalize_symbol).transpose()?,
            year: query.year,
        };
        self.locks
            .with_read(&portfolio.id, || self.live_gains(&portfolio.id, &query))
    }

    fn harvest_opportunities(
        &self,
        ctx: &RequestContext,
        portfolio_id: &str,
        threshold_pct: Option<Decimal>,
    ) -> Result<HarvestReport> {
        self.tax_service
            .harvest_opportunities(ctx, portfolio_id, threshold_pct)
    }

    fn metrics(
        &self,
        ctx: &RequestContext,
        portfolio_id: &str,
        range: PerformanceRange,
    ) -> Result<PerformanceMetrics> {
        self.performance_service
            .calculate_metrics(ctx, portfolio_id, range)
    }
}
