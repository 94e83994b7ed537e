//! Portfolio repository and service traits.
//!
//! These traits define the contract for portfolio operations without any
//! storage-specific types, allowing for different storage implementations.

use super::portfolios_model::{NewPortfolio, Portfolio, PortfolioUpdate};
use crate::context::RequestContext;
use crate::errors::Result;

/// Trait defining the contract for Portfolio repository operations.
pub trait PortfolioRepositoryTrait: Send + Sync {
    /// Persists a fully built portfolio.
    fn create(&self, portfolio: Portfolio) -> Result<Portfolio>;

    /// Replaces an existing portfolio row.
    fn update(&self, portfolio: Portfolio) -> Result<Portfolio>;

    /// Deletes a portfolio and every row it owns (transactions, lots, holdings,
    /// realized gains, portfolio actions, snapshots, import batches).
    ///
    /// Returns the number of deleted portfolio records.
    fn delete(&self, portfolio_id: &str) -> Result<usize>;

    fn get_by_id(&self, portfolio_id: &str) -> Result<Option<Portfolio>>;

    fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Portfolio>>;

    /// All portfolios, for system jobs such as the daily snapshotter.
    fn list_all(&self) -> Result<Vec<Portfolio>>;
}

/// Trait defining the contract for Portfolio service operations.
///
/// Every method checks that the caller owns the portfolio it touches.
pub trait PortfolioServiceTrait: Send + Sync {
    fn create_portfolio(&self, ctx: &RequestContext, new_portfolio: NewPortfolio)
        -> Result<Portfolio>;

    /// Updates name, currency or cost-basis method. The method is locked
    /// once the portfolio has a SELL.
    fn update_portfolio(&self, ctx: &RequestContext, update: PortfolioUpdate) -> Result<Portfolio>;

    fn delete_portfolio(&self, ctx: &RequestContext, portfolio_id: &str) -> Result<()>;

    fn get_portfolio(&self, ctx: &RequestContext, portfolio_id: &str) -> Result<Portfolio>;

    fn list_portfolios(&self, ctx: &RequestContext) -> Result<Vec<Portfolio>>;

    /// Loads a portfolio and checks the caller owns it.
    ///
    /// Unknown ids fail with `PORTFOLIO_NOT_FOUND`; portfolios owned by
    /// someone else fail with `FORBIDDEN`.
    fn authorize(&self, ctx: &RequestContext, portfolio_id: &str) -> Result<Portfolio>;
}
