use chrono::{NaiveDate, Utc};
use log::{error, info, warn};
use rayon::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;

use super::snapshot_model::{DailySnapshotReport, PerformanceSnapshot, SnapshotFailure, SnapshotPage};
use super::snapshot_traits::SnapshotRepositoryTrait;
use crate::constants::{DEFAULT_SNAPSHOT_PAGE_LIMIT, MAX_SNAPSHOT_PAGE_LIMIT};
use crate::context::RequestContext;
use crate::errors::{Error, NotFoundError, Result, ValidationError};
use crate::events::{DomainEvent, DomainEventSink, NoOpDomainEventSink};
use crate::portfolio::lots::LedgerService;
use crate::portfolio::valuation::ValuationService;
use crate::portfolios::{Portfolio, PortfolioLocks, PortfolioRepositoryTrait, PortfolioServiceTrait};
use crate::utils::time_utils::today_utc;
use crate::utils::Deadline;

pub trait SnapshotServiceTrait: Send + Sync {
    /// Snapshots the portfolio for `date` (default today, UTC). Returns the
    /// stored snapshot unchanged when one already exists.
    fn take_snapshot(
        &self,
        ctx: &RequestContext,
        portfolio_id: &str,
        date: Option<NaiveDate>,
    ) -> Result<PerformanceSnapshot>;

    /// Fills every missing day in `[start, end]`. All new snapshots commit
    /// together or not at all.
    fn backfill_snapshots(
        &self,
        ctx: &RequestContext,
        portfolio_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PerformanceSnapshot>>;

    /// Newest first. `limit` defaults to 30 and is capped at 365.
    fn list_snapshots(
        &self,
        ctx: &RequestContext,
        portfolio_id: &str,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Result<SnapshotPage>;

    fn get_snapshot(
        &self,
        ctx: &RequestContext,
        portfolio_id: &str,
        date: NaiveDate,
    ) -> Result<PerformanceSnapshot>;

    /// System job: snapshots every portfolio for `date` in parallel.
    fn run_daily_snapshots(&self, date: NaiveDate, deadline: &Deadline)
        -> Result<DailySnapshotReport>;
}

pub struct SnapshotService {
    portfolio_service: Arc<dyn PortfolioServiceTrait>,
    portfolio_repository: Arc<dyn PortfolioRepositoryTrait>,
    ledger_service: Arc<LedgerService>,
    valuation_service: Arc<ValuationService>,
    repository: Arc<dyn SnapshotRepositoryTrait>,
    locks: Arc<PortfolioLocks>,
    event_sink: Arc<dyn DomainEventSink>,
}

/// Whether a snapshot was written or already there.
enum Taken {
    New(PerformanceSnapshot),
    Existing(PerformanceSnapshot),
}

impl SnapshotService {
    pub fn new(
        portfolio_service: Arc<dyn PortfolioServiceTrait>,
        portfolio_repository: Arc<dyn PortfolioRepositoryTrait>,
        ledger_service: Arc<LedgerService>,
        valuation_service: Arc<ValuationService>,
        repository: Arc<dyn SnapshotRepositoryTrait>,
        locks: Arc<PortfolioLocks>,
    ) -> Self {
        Self {
            portfolio_service,
            portfolio_repository,
            ledger_service,
            valuation_service,
            repository,
            locks,
            event_sink: Arc::new(NoOpDomainEventSink),
        }
    }

    /// Sets the domain event sink for this service.
    pub fn with_event_sink(mut self, event_sink: Arc<dyn DomainEventSink>) -> Self {
        self.event_sink = event_sink;
        self
    }

    fn check_not_future(date: NaiveDate) -> Result<()> {
        let today = today_utc();
        if date > today {
            return Err(ValidationError::InvalidInput(format!(
                "Cannot snapshot {} before the day has happened (today is {})",
                date, today
            ))
            .into());
        }
        Ok(())
    }

    fn snapshot_locked(
        &self,
        portfolio: &Portfolio,
        date: NaiveDate,
        deadline: &Deadline,
    ) -> Result<Taken> {
        self.locks.with_write(&portfolio.id, || {
            if let Some(existing) = self.repository.get(&portfolio.id, date)? {
                return Ok(Taken::Existing(existing));
            }
            let portfolio = self.ledger_service.locked_portfolio(&portfolio.id)?;
            let log = self.ledger_service.load_event_log(&portfolio.id)?;
            let valuation = self
                .valuation_service
                .value_on(&portfolio, &log, date, deadline)?;
            let snapshot = PerformanceSnapshot::from_valuation(&valuation, Utc::now());
            self.repository.insert_many(vec![snapshot.clone()])?;
            Ok(Taken::New(snapshot))
        })
    }
}

impl SnapshotServiceTrait for SnapshotService {
    fn take_snapshot(
        &self,
        ctx: &RequestContext,
        portfolio_id: &str,
        date: Option<NaiveDate>,
    ) -> Result<PerformanceSnapshot> {
        let portfolio = self.portfolio_service.authorize(ctx, portfolio_id)?;
        let date = date.unwrap_or_else(today_utc);
        Self::check_not_future(date)?;
        match self.snapshot_locked(&portfolio, date, &ctx.deadline)? {
            Taken::New(snapshot) => {
                info!("Took snapshot of portfolio {} for {}", portfolio.id, date);
                self.event_sink
                    .emit(DomainEvent::snapshots_taken(vec![portfolio.id.clone()], date));
                Ok(snapshot)
            }
            Taken::Existing(snapshot) => Ok(snapshot),
        }
    }

    fn backfill_snapshots(
        &self,
        ctx: &RequestContext,
        portfolio_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PerformanceSnapshot>> {
        let portfolio = self.portfolio_service.authorize(ctx, portfolio_id)?;
        if start > end {
            return Err(ValidationError::InvalidDateRange { start, end }.into());
        }
        Self::check_not_future(end)?;

        let created = self.locks.with_write(&portfolio.id, || {
            let portfolio = self.ledger_service.locked_portfolio(&portfolio.id)?;
            let log = self.ledger_service.load_event_log(&portfolio.id)?;
            let valuations =
                self.valuation_service
                    .value_series(&portfolio, &log, start, end, &ctx.deadline)?;
            let existing: HashSet<NaiveDate> = valuations
                .iter()
                .map(|v| self.repository.get(&portfolio.id, v.valuation_date))
                .collect::<Result<Vec<_>>>()?
                .into_iter()
                .flatten()
                .map(|snapshot| snapshot.date)
                .collect();
            let now = Utc::now();
            let snapshots: Vec<PerformanceSnapshot> = valuations
                .iter()
                .filter(|v| !existing.contains(&v.valuation_date))
                .map(|v| PerformanceSnapshot::from_valuation(v, now))
                .collect();
            ctx.deadline.check("snapshot backfill")?;
            if !snapshots.is_empty() {
                self.repository.insert_many(snapshots.clone())?;
            }
            Ok(snapshots)
        })?;

        info!(
            "Backfilled {} snapshot(s) of portfolio {} between {} and {}",
            created.len(),
            portfolio.id,
            start,
            end
        );
        if !created.is_empty() {
            self.event_sink.emit_batch(
                created
                    .iter()
                    .map(|s| DomainEvent::snapshots_taken(vec![portfolio.id.clone()], s.date))
                    .collect(),
            );
        }
        Ok(created)
    }

    fn list_snapshots(
        &self,
        ctx: &RequestContext,
        portfolio_id: &str,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Result<SnapshotPage> {
        let portfolio = self.portfolio_service.authorize(ctx, portfolio_id)?;
        let limit = limit.unwrap_or(DEFAULT_SNAPSHOT_PAGE_LIMIT);
        if limit == 0 {
            return Err(Error::invalid_input("limit must be at least 1"));
        }
        let limit = limit.min(MAX_SNAPSHOT_PAGE_LIMIT);
        let offset = offset.unwrap_or(0);
        self.locks.with_read(&portfolio.id, || {
            Ok(SnapshotPage {
                snapshots: self.repository.list(&portfolio.id, limit, offset)?,
                limit,
                offset,
                total: self.repository.count(&portfolio.id)?,
            })
        })
    }

    fn get_snapshot(
        &self,
        ctx: &RequestContext,
        portfolio_id: &str,
        date: NaiveDate,
    ) -> Result<PerformanceSnapshot> {
        let portfolio = self.portfolio_service.authorize(ctx, portfolio_id)?;
        self.locks.with_read(&portfolio.id, || {
            self.repository.get(&portfolio.id, date)?.ok_or_else(|| {
                NotFoundError::Snapshot {
                    portfolio_id: portfolio.id.clone(),
                    date,
                }
                .into()
            })
        })
    }

    fn run_daily_snapshots(
        &self,
        date: NaiveDate,
        deadline: &Deadline,
    ) -> Result<DailySnapshotReport> {
        let portfolios = self.portfolio_repository.list_all()?;
        info!(
            "Running daily snapshots for {} portfolio(s) on {}",
            portfolios.len(),
            date
        );

        let outcomes: Vec<(String, Result<Taken>)> = portfolios
            .par_iter()
            .map(|portfolio| {
                (
                    portfolio.id.clone(),
                    self.snapshot_locked(portfolio, date, deadline),
                )
            })
            .collect();

        let mut report = DailySnapshotReport {
            date,
            taken: Vec::new(),
            existing: Vec::new(),
            failures: Vec::new(),
        };
        for (portfolio_id, outcome) in outcomes {
            match outcome {
                Ok(Taken::New(_)) => report.taken.push(portfolio_id),
                Ok(Taken::Existing(_)) => report.existing.push(portfolio_id),
                Err(e) => {
                    error!("Snapshot of portfolio {} for {} failed: {}", portfolio_id, date, e);
                    report.failures.push(SnapshotFailure {
                        portfolio_id,
                        error: e.to_response(),
                    });
                }
            }
        }

        if !report.failures.is_empty() {
            warn!(
                "Daily snapshots on {}: {} taken, {} failed",
                date,
                report.taken.len(),
                report.failures.len()
            );
        }
        if !report.taken.is_empty() {
            self.event_sink
                .emit(DomainEvent::snapshots_taken(report.taken.clone(), date));
        }
        Ok(report)
    }
}
