//! Price oracle contract, quote models, and the process-wide price cache.

mod market_data_errors;
mod market_data_model;
mod market_data_traits;
mod price_cache;

pub use market_data_errors::MarketDataError;
pub use market_data_model::{PriceSeries, Quote};
pub use market_data_traits::PriceOracle;
pub use price_cache::CachedPriceOracle;
