//! Foliotrack Core - portfolio state engine.
//!
//! Tax lots, cost-basis allocation, corporate actions, holdings and
//! performance analytics derived from a per-portfolio event log. The crate
//! is storage-agnostic: repositories and the price oracle are traits
//! implemented by storage crates such as `foliotrack-storage-memory`.

pub mod constants;
pub mod context;
pub mod corporate_actions;
pub mod errors;
pub mod event_store;
pub mod events;
pub mod imports;
pub mod market_data;
pub mod portfolio;
pub mod portfolios;
pub mod query;
pub mod transactions;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_fixtures;

pub use context::RequestContext;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
