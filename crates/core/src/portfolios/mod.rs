//! Portfolios module - ownership root, cost-basis method, and write locks.

mod portfolio_locks;
mod portfolios_model;
mod portfolios_service;
mod portfolios_traits;


pub use portfolio_locks::PortfolioLocks;
pub use portfolios_model::{CostBasisMethod, NewPortfolio, Portfolio, PortfolioUpdate};
pub use portfolios_service::PortfolioService;
pub use portfolios_traits::{PortfolioRepositoryTrait, PortfolioServiceTrait};
