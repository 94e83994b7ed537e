//! Daily portfolio valuation: positions at carried-forward closes plus cash,
//! converted to the base currency.

mod valuation_calculator;
mod valuation_model;
mod valuation_service;


pub use valuation_calculator::{calculate_value_series, priced_symbols};
pub use valuation_model::DailyValuation;
pub use valuation_service::ValuationService;
