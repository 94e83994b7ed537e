//! Per-request caller context.

use std::time::Duration;

use crate::utils::Deadline;

/// The authenticated principal and deadline a request runs under.
///
/// Authentication happens outside the engine; services only compare
/// `principal_id` with a portfolio's owner.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub principal_id: String,
    pub deadline: Deadline,
}

impl RequestContext {
    pub fn new(principal_id: impl Into<String>) -> Self {
        Self {
            principal_id: principal_id.into(),
            deadline: Deadline::none(),
        }
    }

    pub fn with_deadline(mut self, deadline: Deadline) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Deadline::after(timeout))
    }
}
