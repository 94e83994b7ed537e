use chrono::{Days, NaiveDate};
use log::{debug, info};
use rust_decimal::Decimal;
use std::sync::Arc;

use super::benchmark::benchmark_points;
use super::irr_calculator::{investor_flows, solve_irr};
use super::performance_model::{
    AnnualizedReturn, BenchmarkComparison, MwrResult, PerformanceMetrics, TwrResult, ValuePoint,
};
use super::returns_calculator::{
    calculate_annualized_return, calculate_max_drawdown, calculate_twr, calculate_volatility,
    cumulative_returns, daily_returns,
};
use crate::constants::{DAYS_PER_YEAR, DEFAULT_BENCHMARK_SYMBOL};
use crate::context::RequestContext;
use crate::errors::{Error, PerformanceError, Result, ValidationError};
use crate::event_store::EventLog;
use crate::market_data::{PriceOracle, PriceSeries};
use crate::portfolio::lots::LedgerService;
use crate::portfolio::valuation::{DailyValuation, ValuationService};
use crate::portfolios::{Portfolio, PortfolioLocks, PortfolioServiceTrait};
use crate::utils::time_utils::{days_between, today_utc};
use crate::utils::validation::normalize_symbol;

/// Optional bounds of an analytics request.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PerformanceRange {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl PerformanceRange {
    pub fn new(start_date: Option<NaiveDate>, end_date: Option<NaiveDate>) -> Self {
        Self {
            start_date,
            end_date,
        }
    }

    /// Defaults to the first event through today (UTC).
    pub fn resolve(&self, log: &EventLog) -> Result<(NaiveDate, NaiveDate)> {
        let end = self.end_date.unwrap_or_else(today_utc);
        let start = self.start_date.unwrap_or_else(|| {
            log.events()
                .first()
                .map(|event| event.date())
                .unwrap_or(end)
        });
        if start > end {
            return Err(ValidationError::InvalidDateRange { start, end }.into());
        }
        Ok((start, end))
    }
}

pub trait PerformanceServiceTrait: Send + Sync {
    /// Daily valuations over the range.
    fn value_history(
        &self,
        ctx: &RequestContext,
        portfolio_id: &str,
        range: PerformanceRange,
    ) -> Result<Vec<DailyValuation>>;

    fn calculate_metrics(
        &self,
        ctx: &RequestContext,
        portfolio_id: &str,
        range: PerformanceRange,
    ) -> Result<PerformanceMetrics>;

    fn calculate_twr(
        &self,
        ctx: &RequestContext,
        portfolio_id: &str,
        range: PerformanceRange,
    ) -> Result<TwrResult>;

    /// Fails with `IRR_NONCONVERGENT` (carrying the best estimate) when the
    /// solver does not converge.
    fn calculate_mwr(
        &self,
        ctx: &RequestContext,
        portfolio_id: &str,
        range: PerformanceRange,
    ) -> Result<MwrResult>;

    fn calculate_annualized_return(
        &self,
        ctx: &RequestContext,
        portfolio_id: &str,
        range: PerformanceRange,
    ) -> Result<AnnualizedReturn>;

    /// Alpha against a buy-and-hold of `benchmark_symbol` (default `SPY`).
    fn compare_to_benchmark(
        &self,
        ctx: &RequestContext,
        portfolio_id: &str,
        benchmark_symbol: Option<&str>,
        range: PerformanceRange,
    ) -> Result<BenchmarkComparison>;
}

pub struct PerformanceService {
    portfolio_service: Arc<dyn PortfolioServiceTrait>,
    ledger_service: Arc<LedgerService>,
    valuation_service: Arc<ValuationService>,
    locks: Arc<PortfolioLocks>,
}

/// Valuations of a resolved range.
struct ValuedRange {
    portfolio: Portfolio,
    start: NaiveDate,
    end: NaiveDate,
    valuations: Vec<DailyValuation>,
}

impl ValuedRange {
    fn points(&self) -> Vec<ValuePoint> {
        self.valuations.iter().map(ValuePoint::from).collect()
    }

    /// Deposits and withdrawals dated after the first day.
    fn flows_after_start(&self) -> (Decimal, Decimal) {
        self.valuations
            .iter()
            .skip(1)
            .fold((Decimal::ZERO, Decimal::ZERO), |(deposits, withdrawals), v| {
                (deposits + v.deposits, withdrawals + v.withdrawals)
            })
    }

    fn start_value(&self) -> Decimal {
        self.valuations
            .first()
            .map(|v| v.total_value)
            .unwrap_or(Decimal::ZERO)
    }

    fn end_value(&self) -> Decimal {
        self.valuations
            .last()
            .map(|v| v.total_value)
            .unwrap_or(Decimal::ZERO)
    }
}

impl PerformanceService {
    pub fn new(
        portfolio_service: Arc<dyn PortfolioServiceTrait>,
        ledger_service: Arc<LedgerService>,
        valuation_service: Arc<ValuationService>,
        locks: Arc<PortfolioLocks>,
    ) -> Self {
        Self {
            portfolio_service,
            ledger_service,
            valuation_service,
            locks,
        }
    }

    fn value_range(
        &self,
        ctx: &RequestContext,
        portfolio_id: &str,
        range: PerformanceRange,
    ) -> Result<ValuedRange> {
        let portfolio = self.portfolio_service.authorize(ctx, portfolio_id)?;
        let log = self.locks.with_read(&portfolio.id, || {
            self.ledger_service.load_event_log(&portfolio.id)
        })?;
        let (start, end) = range.resolve(&log)?;
        let valuations =
            self.valuation_service
                .value_series(&portfolio, &log, start, end, &ctx.deadline)?;
        Ok(ValuedRange {
            portfolio,
            start,
            end,
            valuations,
        })
    }

    fn solve_mwr(valued: &ValuedRange, ctx: &RequestContext) -> Result<Option<MwrResult>> {
        if valued.start == valued.end {
            return Ok(None);
        }
        let flows = investor_flows(&valued.points());
        if flows.iter().all(|flow| flow.amount.is_zero()) {
            return Ok(None);
        }
        let solution = solve_irr(&flows, valued.end, &ctx.deadline)?;
        Ok(Some(MwrResult {
            start_date: valued.start,
            end_date: valued.end,
            rate: solution.rate,
            converged: solution.converged,
            iterations: solution.iterations,
        }))
    }

    fn annualized(valued: &ValuedRange) -> AnnualizedReturn {
        let (net_deposits, net_withdrawals) = valued.flows_after_start();
        let days = days_between(valued.start, valued.end);
        AnnualizedReturn {
            start_date: valued.start,
            end_date: valued.end,
            start_value: valued.start_value(),
            end_value: valued.end_value(),
            net_deposits,
            net_withdrawals,
            years: Decimal::from(days) / DAYS_PER_YEAR,
            annualized_return: calculate_annualized_return(
                valued.start_value(),
                valued.end_value(),
                net_deposits,
                net_withdrawals,
                days,
            ),
        }
    }
}

impl PerformanceServiceTrait for PerformanceService {
    fn value_history(
        &self,
        ctx: &RequestContext,
        portfolio_id: &str,
        range: PerformanceRange,
    ) -> Result<Vec<DailyValuation>> {
        Ok(self.value_range(ctx, portfolio_id, range)?.valuations)
    }

    fn calculate_metrics(
        &self,
        ctx: &RequestContext,
        portfolio_id: &str,
        range: PerformanceRange,
    ) -> Result<PerformanceMetrics> {
        let valued = self.value_range(ctx, portfolio_id, range)?;
        let points = valued.points();
        let twr = calculate_twr(&points, &ctx.deadline)?;
        let mwr = Self::solve_mwr(&valued, ctx)?;
        let annualized = Self::annualized(&valued);
        let daily = daily_returns(&points);

        let metrics = PerformanceMetrics {
            portfolio_id: valued.portfolio.id.clone(),
            currency: valued.portfolio.base_currency.clone(),
            start_date: valued.start,
            end_date: valued.end,
            start_value: annualized.start_value,
            end_value: annualized.end_value,
            net_deposits: annualized.net_deposits,
            net_withdrawals: annualized.net_withdrawals,
            simple_gain: annualized.end_value - annualized.start_value
                - (annualized.net_deposits - annualized.net_withdrawals),
            twr: twr.twr,
            annualized_twr: twr.annualized_twr,
            mwr,
            annualized_return: annualized.annualized_return,
            volatility: calculate_volatility(&daily),
            max_drawdown: calculate_max_drawdown(&daily),
            returns: cumulative_returns(&points),
        };
        info!(
            "Calculated performance of portfolio {} from {} to {}: TWR {}",
            metrics.portfolio_id, metrics.start_date, metrics.end_date, metrics.twr
        );
        Ok(metrics)
    }

    fn calculate_twr(
        &self,
        ctx: &RequestContext,
        portfolio_id: &str,
        range: PerformanceRange,
    ) -> Result<TwrResult> {
        let valued = self.value_range(ctx, portfolio_id, range)?;
        calculate_twr(&valued.points(), &ctx.deadline)
    }

    fn calculate_mwr(
        &self,
        ctx: &RequestContext,
        portfolio_id: &str,
        range: PerformanceRange,
    ) -> Result<MwrResult> {
        let valued = self.value_range(ctx, portfolio_id, range)?;
        let mwr = Self::solve_mwr(&valued, ctx)?.ok_or_else(|| {
            Error::from(PerformanceError::InsufficientData(format!(
                "no flows to solve between {} and {}",
                valued.start, valued.end
            )))
        })?;
        if !mwr.converged {
            return Err(PerformanceError::IrrNonConvergent {
                best_estimate: mwr.rate,
                iterations: mwr.iterations,
            }
            .into());
        }
        Ok(mwr)
    }

    fn calculate_annualized_return(
        &self,
        ctx: &RequestContext,
        portfolio_id: &str,
        range: PerformanceRange,
    ) -> Result<AnnualizedReturn> {
        let valued = self.value_range(ctx, portfolio_id, range)?;
        Ok(Self::annualized(&valued))
    }

    fn compare_to_benchmark(
        &self,
        ctx: &RequestContext,
        portfolio_id: &str,
        benchmark_symbol: Option<&str>,
        range: PerformanceRange,
    ) -> Result<BenchmarkComparison> {
        let symbol = normalize_symbol(benchmark_symbol.unwrap_or(DEFAULT_BENCHMARK_SYMBOL))?;
        let valued = self.value_range(ctx, portfolio_id, range)?;
        let points = valued.points();

        // History before the range lets the first day carry a close forward.
        let lookback = valued
            .start
            .checked_sub_days(Days::new(7))
            .unwrap_or(valued.start);
        let quotes = self
            .valuation_service
            .price_oracle()
            .historical(&symbol, lookback, valued.end)?;
        let prices = PriceSeries::from_quotes(&quotes);
        let benchmark = benchmark_points(&symbol, &points, &prices)?;

        let portfolio_twr = calculate_twr(&points, &ctx.deadline)?.twr;
        let benchmark_twr = calculate_twr(&benchmark, &ctx.deadline)?.twr;
        debug!(
            "Portfolio {} TWR {} vs {} TWR {}",
            valued.portfolio.id, portfolio_twr, symbol, benchmark_twr
        );

        Ok(BenchmarkComparison {
            start_date: valued.start,
            end_date: valued.end,
            benchmark_symbol: symbol,
            portfolio_twr,
            benchmark_twr,
            alpha: portfolio_twr - benchmark_twr,
        })
    }
}
