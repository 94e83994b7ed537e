//! Domain events module.
//!
//! Provides domain event types and the sink trait for emitting events
//! after successful commits. The daemon installs a logging sink; tests use
//! the collecting mock.

mod domain_event;
mod sink;

pub use domain_event::*;
pub use sink::*;
