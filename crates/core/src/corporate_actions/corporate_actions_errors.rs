use thiserror::Error;

use super::corporate_actions_model::ActionStatus;
use crate::errors::ErrorKind;

/// Illegal move in the portfolio-action state machine.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionError {
    #[error("action is {0}, expected PENDING")]
    NotPending(ActionStatus),

    #[error("action is {0}, expected APPROVED")]
    NotApproved(ActionStatus),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CorporateActionError {
    #[error("Portfolio action {action_id}: {source}")]
    Transition {
        action_id: String,
        #[source]
        source: TransitionError,
    },

    #[error("Invalid corporate action: {0}")]
    InvalidDefinition(String),
}

impl CorporateActionError {
    pub fn transition(action_id: &str, source: TransitionError) -> Self {
        CorporateActionError::Transition {
            action_id: action_id.to_string(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CorporateActionError::Transition {
                source: TransitionError::NotPending(_),
                ..
            } => ErrorKind::BusinessRule,
            CorporateActionError::Transition {
                source: TransitionError::NotApproved(_),
                ..
            } => ErrorKind::Conflict,
            CorporateActionError::InvalidDefinition(_) => ErrorKind::Validation,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            CorporateActionError::Transition {
                source: TransitionError::NotPending(_),
                ..
            } => "ACTION_NOT_PENDING",
            CorporateActionError::Transition {
                source: TransitionError::NotApproved(_),
                ..
            } => "ACTION_NOT_APPROVED",
            CorporateActionError::InvalidDefinition(_) => "VALIDATION_ERROR",
        }
    }
}
