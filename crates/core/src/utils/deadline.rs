//! Request deadlines for long computations.

use std::time::{Duration, Instant};

use crate::errors::{Error, Result};

/// A point in time after which a computation must give up.
///
/// Long loops (IRR iterations, sub-period walks, snapshot rebuilds) call
/// [`Deadline::check`] between steps. Nothing is written before the check
/// passes, so an expired deadline never leaves partial state.
#[derive(Debug, Clone, Copy, Default)]
pub struct Deadline {
    expires_at: Option<Instant>,
}

impl Deadline {
    /// A deadline that never expires.
    pub fn none() -> Self {
        Self { expires_at: None }
    }

    pub fn after(timeout: Duration) -> Self {
        Self {
            expires_at: Instant::now().checked_add(timeout),
        }
    }

    pub fn at(instant: Instant) -> Self {
        Self {
            expires_at: Some(instant),
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at
            .map(|expires_at| Instant::now() >= expires_at)
            .unwrap_or(false)
    }

    /// Fails with `DEADLINE_EXCEEDED` once the deadline has passed.
    pub fn check(&self, stage: &str) -> Result<()> {
        if self.is_expired() {
            return Err(Error::DeadlineExceeded(stage.to_string()));
        }
        Ok(())
    }
}
