//! Tax lots: models, cost-basis allocation, the replaying ledger and its service.

mod allocator;
mod ledger;
mod ledger_service;
mod lots_model;
mod lots_traits;

#[cfg(test)]
mod allocator_tests;

pub use allocator::{allocate, sort_lots_for_method, Allocation, AllocationOutcome};
pub use ledger::TaxLotLedger;
pub use ledger_service::LedgerService;
pub use lots_model::{DerivedState, RealizedGain, TaxLot};
pub use lots_traits::LedgerRepositoryTrait;
