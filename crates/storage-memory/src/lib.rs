//! In-process storage implementation for Foliotrack.
//!
//! Implements every repository trait of `foliotrack-core` over a single
//! state value guarded by a lock. Writes apply to a working copy that is
//! installed only on success, which gives the all-or-nothing commits the
//! engine relies on. The state can be dumped to and loaded from JSON.
//!
//! ```text
//!        core (domain)
//!             │
//!             ▼
//!   storage-memory (this crate)
//!             │
//!             ▼
//!     StoreState ⇄ state.json
//! ```

pub mod db;
pub mod engine;
pub mod errors;
pub mod market_data;

// Repository implementations
pub mod corporate_actions;
pub mod event_store;
pub mod imports;
pub mod portfolio;
pub mod portfolios;
pub mod transactions;

pub use db::{MemoryDb, PortfolioState, StoreState};
pub use engine::Engine;
pub use errors::{IntoCore, StorageError};
pub use market_data::{FxRate, PriceFile, StaticPriceOracle};

// Re-export from foliotrack-core for convenience
pub use foliotrack_core::errors::{DatabaseError, Error, Result};
