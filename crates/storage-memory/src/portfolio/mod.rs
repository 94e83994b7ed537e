pub mod holdings;
pub mod lots;
pub mod snapshot;
