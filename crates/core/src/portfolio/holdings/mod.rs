//! Holdings projection: open lots reduced per symbol, with live valuation.

mod holdings_calculator;
mod holdings_model;
mod holdings_service;
mod holdings_traits;
mod holdings_valuation_service;

#[cfg(test)]
mod holdings_valuation_service_tests;

pub use holdings_calculator::project_holdings;
pub use holdings_model::{Holding, HoldingsSummary, MonetaryValue, ValuedHolding};
pub use holdings_service::{HoldingsService, HoldingsServiceTrait};
pub use holdings_traits::HoldingsRepositoryTrait;
pub use holdings_valuation_service::HoldingsValuationService;
