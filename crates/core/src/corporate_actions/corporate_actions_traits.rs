//! Corporate action repository and service traits.

use super::corporate_actions_model::{
    ActionStatus, ApprovalResult, CorporateAction, NewCorporateAction, PortfolioAction,
};
use crate::context::RequestContext;
use crate::errors::Result;

/// Storage for global corporate actions and per-portfolio review rows.
///
/// Portfolio actions are written through
/// [`crate::event_store::EventStoreTrait::commit`] so that an APPLIED status
/// and the re-derived lots land together.
pub trait CorporateActionRepositoryTrait: Send + Sync {
    fn create(&self, corporate_action: CorporateAction) -> Result<CorporateAction>;

    fn get_by_id(&self, corporate_action_id: &str) -> Result<Option<CorporateAction>>;

    /// Lists corporate actions, optionally for one symbol, in `(date, id)` order.
    fn list(&self, symbol: Option<&str>) -> Result<Vec<CorporateAction>>;

    fn get_portfolio_action(&self, action_id: &str) -> Result<Option<PortfolioAction>>;

    /// Lists a portfolio's review rows in `(detected_at, id)` order.
    fn list_portfolio_actions(
        &self,
        portfolio_id: &str,
        status: Option<ActionStatus>,
    ) -> Result<Vec<PortfolioAction>>;
}

/// Review workflow over detected corporate actions.
pub trait CorporateActionServiceTrait: Send + Sync {
    /// Registers global reference data.
    fn create_corporate_action(&self, new_action: NewCorporateAction) -> Result<CorporateAction>;

    fn list_corporate_actions(&self, symbol: Option<&str>) -> Result<Vec<CorporateAction>>;

    /// Scans the portfolio's open holdings and creates PENDING rows for
    /// matching actions not yet reviewed. Returns the new rows.
    fn detect_actions(&self, ctx: &RequestContext, portfolio_id: &str)
        -> Result<Vec<PortfolioAction>>;

    fn list_actions(
        &self,
        ctx: &RequestContext,
        portfolio_id: &str,
        status: Option<ActionStatus>,
    ) -> Result<Vec<PortfolioAction>>;

    fn get_action(&self, ctx: &RequestContext, action_id: &str) -> Result<PortfolioAction>;

    /// Approves a PENDING action and applies it. A failed application keeps
    /// the approval and reports the error in the result.
    fn approve_action(
        &self,
        ctx: &RequestContext,
        action_id: &str,
        notes: Option<String>,
    ) -> Result<ApprovalResult>;

    fn reject_action(
        &self,
        ctx: &RequestContext,
        action_id: &str,
        reason: Option<String>,
    ) -> Result<PortfolioAction>;

    /// Applies an APPROVED action. Already APPLIED actions are returned as is.
    fn retry_apply(&self, ctx: &RequestContext, action_id: &str) -> Result<PortfolioAction>;
}
