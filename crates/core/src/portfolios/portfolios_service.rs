use chrono::Utc;
use log::{debug, info};
use std::sync::Arc;
use uuid::Uuid;

use super::portfolio_locks::PortfolioLocks;
use super::portfolios_model::{NewPortfolio, Portfolio, PortfolioUpdate};
use super::portfolios_traits::{PortfolioRepositoryTrait, PortfolioServiceTrait};
use crate::context::RequestContext;
use crate::errors::{Error, NotFoundError, Result};
use crate::events::{DomainEvent, DomainEventSink, NoOpDomainEventSink};
use crate::transactions::{TransactionFilter, TransactionRepositoryTrait, TransactionType};

/// Service for managing portfolios and checking ownership.
pub struct PortfolioService {
    repository: Arc<dyn PortfolioRepositoryTrait>,
    transaction_repository: Arc<dyn TransactionRepositoryTrait>,
    locks: Arc<PortfolioLocks>,
    event_sink: Arc<dyn DomainEventSink>,
}

impl PortfolioService {
    pub fn new(
        repository: Arc<dyn PortfolioRepositoryTrait>,
        transaction_repository: Arc<dyn TransactionRepositoryTrait>,
        locks: Arc<PortfolioLocks>,
    ) -> Self {
        Self {
            repository,
            transaction_repository,
            locks,
            event_sink: Arc::new(NoOpDomainEventSink),
        }
    }

    /// Sets the domain event sink for this service.
    pub fn with_event_sink(mut self, event_sink: Arc<dyn DomainEventSink>) -> Self {
        self.event_sink = event_sink;
        self
    }

    fn has_sales(&self, portfolio_id: &str) -> Result<bool> {
        let filter = TransactionFilter {
            transaction_types: Some(vec![TransactionType::Sell]),
            ..TransactionFilter::default()
        };
        Ok(!self.transaction_repository.list(portfolio_id, &filter)?.is_empty())
    }
}

impl PortfolioServiceTrait for PortfolioService {
    fn create_portfolio(
        &self,
        ctx: &RequestContext,
        mut new_portfolio: NewPortfolio,
    ) -> Result<Portfolio> {
        new_portfolio.validate()?;
        let now = Utc::now();
        let portfolio = Portfolio {
            id: new_portfolio
                .id
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            owner_id: ctx.principal_id.clone(),
            name: new_portfolio.name,
            base_currency: new_portfolio.base_currency,
            cost_basis_method: new_portfolio.cost_basis_method,
            created_at: now,
            updated_at: now,
        };
        debug!(
            "Creating portfolio {} ({}, {}) for {}",
            portfolio.id, portfolio.base_currency, portfolio.cost_basis_method, portfolio.owner_id
        );
        self.repository.create(portfolio)
    }

    fn update_portfolio(&self, ctx: &RequestContext, mut update: PortfolioUpdate) -> Result<Portfolio> {
        update.validate()?;
        let owned = self.authorize(ctx, &update.id)?;

        self.locks.with_write(&owned.id, || {
            // Merge onto the stored row; another writer may have changed it.
            let mut portfolio = self
                .repository
                .get_by_id(&owned.id)?
                .ok_or_else(|| Error::from(NotFoundError::Portfolio(owned.id.clone())))?;
            if let Some(method) = update.cost_basis_method {
                if method != portfolio.cost_basis_method {
                    if self.has_sales(&portfolio.id)? {
                        return Err(Error::MethodLocked(portfolio.id.clone()));
                    }
                    info!(
                        "Portfolio {} switches cost basis method {} -> {}",
                        portfolio.id, portfolio.cost_basis_method, method
                    );
                    portfolio.cost_basis_method = method;
                }
            }
            if let Some(name) = update.name.take() {
                portfolio.name = name;
            }
            if let Some(currency) = update.base_currency.take() {
                portfolio.base_currency = currency;
            }
            portfolio.updated_at = Utc::now();
            self.repository.update(portfolio)
        })
    }

    fn delete_portfolio(&self, ctx: &RequestContext, portfolio_id: &str) -> Result<()> {
        let portfolio = self.authorize(ctx, portfolio_id)?;
        self.locks
            .with_write(&portfolio.id, || self.repository.delete(&portfolio.id))?;
        self.locks.remove(&portfolio.id);
        info!("Deleted portfolio {}", portfolio.id);
        self.event_sink
            .emit(DomainEvent::portfolio_deleted(portfolio.id.clone()));
        Ok(())
    }

    fn get_portfolio(&self, ctx: &RequestContext, portfolio_id: &str) -> Result<Portfolio> {
        self.authorize(ctx, portfolio_id)
    }

    fn list_portfolios(&self, ctx: &RequestContext) -> Result<Vec<Portfolio>> {
        self.repository.list_by_owner(&ctx.principal_id)
    }

    fn authorize(&self, ctx: &RequestContext, portfolio_id: &str) -> Result<Portfolio> {
        let portfolio = self
            .repository
            .get_by_id(portfolio_id)?
            .ok_or_else(|| Error::from(NotFoundError::Portfolio(portfolio_id.to_string())))?;
        if !portfolio.is_owned_by(&ctx.principal_id) {
            return Err(Error::Forbidden {
                principal_id: ctx.principal_id.clone(),
                portfolio_id: portfolio.id,
            });
        }
        Ok(portfolio)
    }
}
