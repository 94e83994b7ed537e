use std::sync::Arc;

use crate::db::{MemoryDb, PortfolioState};
use crate::errors::StorageError;
use foliotrack_core::errors::Result;
use foliotrack_core::portfolios::{Portfolio, PortfolioRepositoryTrait};

pub struct PortfolioRepository {
    db: Arc<MemoryDb>,
}

impl PortfolioRepository {
    pub fn new(db: Arc<MemoryDb>) -> Self {
        Self { db }
    }
}

fn by_creation(portfolios: &mut [Portfolio]) {
    portfolios.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
}

impl PortfolioRepositoryTrait for PortfolioRepository {
    fn create(&self, portfolio: Portfolio) -> Result<Portfolio> {
        self.db.write(|state| {
            if state.portfolios.contains_key(&portfolio.id) {
                return Err(StorageError::UniqueViolation(format!(
                    "portfolios.id {}",
                    portfolio.id
                )));
            }
            state.portfolios.insert(
                portfolio.id.clone(),
                Arc::new(PortfolioState::new(portfolio.clone())),
            );
            Ok(portfolio)
        })
    }

    fn update(&self, portfolio: Portfolio) -> Result<Portfolio> {
        self.db.write(|state| match state.portfolio_mut(&portfolio.id) {
            Some(partition) => {
                partition.portfolio = portfolio.clone();
                Ok(portfolio)
            }
            None => Err(StorageError::MissingRow(format!(
                "portfolios.id {}",
                portfolio.id
            ))),
        })
    }

    fn delete(&self, portfolio_id: &str) -> Result<usize> {
        self.db
            .write(|state| Ok(usize::from(state.remove_portfolio(portfolio_id))))
    }

    fn get_by_id(&self, portfolio_id: &str) -> Result<Option<Portfolio>> {
        self.db
            .read(|state| state.portfolio(portfolio_id).map(|p| p.portfolio.clone()))
    }

    fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Portfolio>> {
        let mut portfolios = self.db.read(|state| {
            state
                .partitions()
                .map(|p| &p.portfolio)
                .filter(|p| p.owner_id == owner_id)
                .cloned()
                .collect::<Vec<_>>()
        })?;
        by_creation(&mut portfolios);
        Ok(portfolios)
    }

    fn list_all(&self) -> Result<Vec<Portfolio>> {
        let mut portfolios = self.db.read(|state| {
            state
                .partitions()
                .map(|p| p.portfolio.clone())
                .collect::<Vec<_>>()
        })?;
        by_creation(&mut portfolios);
        Ok(portfolios)
    }
}
