//! Event store contract.
//!
//! The event log (transactions plus applied corporate actions) is the source
//! of truth for a portfolio. Every portfolio write is expressed as one
//! [`PortfolioWrite`] and committed all-or-nothing.

mod event_store_model;
mod event_store_traits;

pub use event_store_model::{merge_event_log, EventLog, LedgerEvent, PortfolioWrite};
pub use event_store_traits::EventStoreTrait;
