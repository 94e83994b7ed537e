//! Corporate actions module - reference data, detection and the review workflow.

mod corporate_actions_errors;
mod corporate_actions_model;
mod corporate_actions_service;
mod corporate_actions_traits;
mod detector;

#[cfg(test)]
mod corporate_actions_model_tests;

pub use corporate_actions_errors::{CorporateActionError, TransitionError};
pub use corporate_actions_model::{
    ActionApplication, ActionStatus, ApprovalResult, CorporateAction, CorporateActionType,
    NewCorporateAction, PortfolioAction,
};
pub use corporate_actions_service::CorporateActionService;
pub use corporate_actions_traits::{CorporateActionRepositoryTrait, CorporateActionServiceTrait};
pub use detector::detect_pending_actions;
