//! Transactions module - the event log of buys, sells and cash operations.

mod fingerprint;
mod transactions_constants;
mod transactions_model;
mod transactions_service;
mod transactions_traits;

#[cfg(test)]
mod transactions_model_tests;

pub use fingerprint::compute_fingerprint;
pub use transactions_constants::*;
pub use transactions_model::{
    check_lot_selections, next_created_at, sort_in_event_order, LotSelection, NewTransaction, Transaction, TransactionFilter,
    TransactionType, TransactionUpdate,
};
pub use transactions_service::TransactionService;
pub use transactions_traits::{TransactionRepositoryTrait, TransactionServiceTrait};
