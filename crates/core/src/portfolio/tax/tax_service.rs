use log::{debug, warn};
use rust_decimal::Decimal;
use std::collections::BTreeSet;
use std::sync::Arc;

use super::tax_calculator::{
    build_tax_report, harvest_candidate, preview_allocation, resolve_harvest_threshold,
    sort_by_largest_loss,
};
use super::tax_model::{AllocationPreview, AllocationPreviewRequest, HarvestReport, TaxReport};
use crate::context::RequestContext;
use crate::errors::{Error, Result};
use crate::market_data::PriceOracle;
use crate::portfolio::lots::{LedgerService, TaxLot};
use crate::portfolios::{CostBasisMethod, Portfolio, PortfolioLocks, PortfolioServiceTrait};
use crate::transactions::{check_lot_selections, TransactionType};
use crate::utils::time_utils::{today_utc, year_bounds};
use crate::utils::validation::normalize_symbol;

pub trait TaxServiceTrait: Send + Sync {
    /// Shows which lots a sale would consume without recording it.
    fn preview_allocation(
        &self,
        ctx: &RequestContext,
        portfolio_id: &str,
        request: AllocationPreviewRequest,
    ) -> Result<AllocationPreview>;

    /// Realized gains of live sales in `tax_year`, split short/long term.
    fn tax_report(&self, ctx: &RequestContext, portfolio_id: &str, tax_year: i32)
        -> Result<TaxReport>;

    /// Open lots whose unrealized return is at or below `threshold_pct`
    /// (default -3).
    fn harvest_opportunities(
        &self,
        ctx: &RequestContext,
        portfolio_id: &str,
        threshold_pct: Option<Decimal>,
    ) -> Result<HarvestReport>;
}

pub struct TaxService {
    portfolio_service: Arc<dyn PortfolioServiceTrait>,
    ledger_service: Arc<LedgerService>,
    price_oracle: Arc<dyn PriceOracle>,
    locks: Arc<PortfolioLocks>,
}

impl TaxService {
    pub fn new(
        portfolio_service: Arc<dyn PortfolioServiceTrait>,
        ledger_service: Arc<LedgerService>,
        price_oracle: Arc<dyn PriceOracle>,
        locks: Arc<PortfolioLocks>,
    ) -> Self {
        Self {
            portfolio_service,
            ledger_service,
            price_oracle,
            locks,
        }
    }

    fn resolve_method(portfolio: &Portfolio, method: Option<&str>) -> Result<CostBasisMethod> {
        match method {
            Some(raw) => Ok(raw.parse::<CostBasisMethod>()?),
            None => Ok(portfolio.cost_basis_method),
        }
    }

    /// Finds harvest candidates among `lots`; lots that cannot be priced
    /// are reported by symbol instead.
    pub(crate) fn scan_lots(
        &self,
        portfolio: &Portfolio,
        lots: &[TaxLot],
        threshold_pct: Decimal,
    ) -> HarvestReport {
        let as_of = today_utc();
        let mut opportunities = Vec::new();
        let mut unpriced = BTreeSet::new();

        for lot in lots.iter().filter(|lot| lot.is_open()) {
            let quote = match self.price_oracle.quote(&lot.symbol) {
                Ok(quote) => quote,
                Err(e) => {
                    warn!("No quote for {} while scanning harvest lots: {}", lot.symbol, e);
                    unpriced.insert(lot.symbol.clone());
                    continue;
                }
            };
            let fx_rate = match self
                .price_oracle
                .fx(&lot.currency, &portfolio.base_currency, quote.date)
            {
                Ok(rate) => rate,
                Err(e) => {
                    warn!(
                        "No {}/{} rate for {} while scanning harvest lots: {}",
                        lot.currency, portfolio.base_currency, lot.symbol, e
                    );
                    unpriced.insert(lot.symbol.clone());
                    continue;
                }
            };
            if let Some(opportunity) = harvest_candidate(lot, &quote, fx_rate, threshold_pct, as_of)
            {
                opportunities.push(opportunity);
            }
        }

        sort_by_largest_loss(&mut opportunities);
        let total_harvestable_loss = opportunities
            .iter()
            .map(|o| o.unrealized_gain_base)
            .sum();
        HarvestReport {
            portfolio_id: portfolio.id.clone(),
            threshold_pct,
            opportunities,
            total_harvestable_loss,
            unpriced_symbols: unpriced.into_iter().collect(),
        }
    }
}

impl TaxServiceTrait for TaxService {
    fn preview_allocation(
        &self,
        ctx: &RequestContext,
        portfolio_id: &str,
        request: AllocationPreviewRequest,
    ) -> Result<AllocationPreview> {
        let portfolio = self.portfolio_service.authorize(ctx, portfolio_id)?;
        let symbol = normalize_symbol(&request.symbol)?;
        let method = Self::resolve_method(&portfolio, request.method.as_deref())?;
        let selections = request.lot_selections.as_deref();
        check_lot_selections(method, TransactionType::Sell, selections)?;
        if let Some(price) = request.price {
            if price.is_sign_negative() {
                return Err(Error::invalid_input("price must not be negative"));
            }
        }
        let sale_date = request.sale_date.unwrap_or_else(today_utc);

        let lots = self
            .locks
            .with_read(&portfolio.id, || self.ledger_service.list_lots(&portfolio.id, Some(&symbol)))?;
        let open_lots: Vec<TaxLot> = lots
            .into_iter()
            .filter(|lot| lot.is_open() && lot.purchase_date <= sale_date)
            .collect();
        debug!(
            "Previewing {} {} of portfolio {} against {} open lot(s) by {}",
            request.quantity,
            symbol,
            portfolio.id,
            open_lots.len(),
            method
        );
        preview_allocation(
            &symbol,
            &open_lots,
            request.quantity,
            sale_date,
            method,
            selections,
            request.price,
        )
    }

    fn tax_report(
        &self,
        ctx: &RequestContext,
        portfolio_id: &str,
        tax_year: i32,
    ) -> Result<TaxReport> {
        let portfolio = self.portfolio_service.authorize(ctx, portfolio_id)?;
        year_bounds(tax_year)?;
        let (gains, log) = self.locks.with_read(&portfolio.id, || {
            Ok((
                self.ledger_service.list_realized_gains(&portfolio.id)?,
                self.ledger_service.load_event_log(&portfolio.id)?,
            ))
        })?;
        Ok(build_tax_report(
            &portfolio.id,
            tax_year,
            &gains,
            &log.transactions,
        ))
    }

    fn harvest_opportunities(
        &self,
        ctx: &RequestContext,
        portfolio_id: &str,
        threshold_pct: Option<Decimal>,
    ) -> Result<HarvestReport> {
        let portfolio = self.portfolio_service.authorize(ctx, portfolio_id)?;
        let threshold = resolve_harvest_threshold(threshold_pct)?;
        let lots = self
            .locks
            .with_read(&portfolio.id, || self.ledger_service.list_lots(&portfolio.id, None))?;
        Ok(self.scan_lots(&portfolio, &lots, threshold))
    }
}
