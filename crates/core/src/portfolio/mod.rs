//! Derived portfolio state and analytics built on the event log.

pub mod holdings;
pub mod lots;
pub mod performance;
pub mod snapshot;
pub mod tax;
pub mod valuation;

pub use holdings::*;
pub use lots::*;
pub use performance::*;
pub use snapshot::*;
pub use tax::*;
pub use valuation::*;
