//! Read-only façade over a portfolio's derived state and analytics.

mod query_model;
mod query_service;

pub use query_model::{GainQuery, PortfolioOverview, RealizedGainTotals};
pub use query_service::{PortfolioQueryService, PortfolioQueryServiceTrait};
