//! Corporate action and portfolio review models.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use super::corporate_actions_errors::{CorporateActionError, TransitionError};
use crate::errors::{Error, ErrorResponse, Result};
use crate::utils::validation::{normalize_currency, normalize_symbol};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CorporateActionType {
    Split,
    Dividend,
    Merger,
}

/// Global reference data describing an event on a symbol. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorporateAction {
    pub id: String,
    pub symbol: String,
    pub action_type: CorporateActionType,
    pub date: NaiveDate,
    /// New shares per old share (SPLIT, MERGER).
    pub ratio: Option<Decimal>,
    /// Cash per share (DIVIDEND).
    pub amount: Option<Decimal>,
    /// Successor symbol (MERGER).
    pub new_symbol: Option<String>,
    pub currency: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CorporateAction {
    /// Ratio of a SPLIT or MERGER. Validated on creation.
    pub fn ratio_or_zero(&self) -> Decimal {
        self.ratio.unwrap_or(Decimal::ZERO)
    }
}

/// Input model for registering a corporate action.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCorporateAction {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub symbol: String,
    pub action_type: CorporateActionType,
    pub date: NaiveDate,
    pub ratio: Option<Decimal>,
    pub amount: Option<Decimal>,
    pub new_symbol: Option<String>,
    pub currency: Option<String>,
}

impl NewCorporateAction {
    /// SPLIT and MERGER need `ratio > 0`, DIVIDEND needs `amount > 0`,
    /// MERGER needs a distinct `new_symbol`.
    pub fn validate(&mut self) -> Result<()> {
        self.symbol = normalize_symbol(&self.symbol)?;
        if let Some(currency) = self.currency.as_deref() {
            self.currency = Some(normalize_currency(currency)?);
        }

        let invalid =
            |msg: String| -> Error { CorporateActionError::InvalidDefinition(msg).into() };
        match self.action_type {
            CorporateActionType::Split | CorporateActionType::Merger => match self.ratio {
                Some(ratio) if ratio > Decimal::ZERO => {}
                _ => return Err(invalid(format!("{:?} requires a ratio > 0", self.action_type))),
            },
            CorporateActionType::Dividend => match self.amount {
                Some(amount) if amount > Decimal::ZERO => {}
                _ => return Err(invalid("DIVIDEND requires an amount > 0".to_string())),
            },
        }

        if self.action_type == CorporateActionType::Merger {
            let new_symbol = match self.new_symbol.as_deref() {
                Some(s) if !s.trim().is_empty() => normalize_symbol(s)?,
                _ => return Err(invalid("MERGER requires new_symbol".to_string())),
            };
            if new_symbol == self.symbol {
                return Err(invalid("MERGER new_symbol must differ from symbol".to_string()));
            }
            self.new_symbol = Some(new_symbol);
        }
        Ok(())
    }

    pub fn into_corporate_action(self, id: String, created_at: DateTime<Utc>) -> CorporateAction {
        CorporateAction {
            id,
            symbol: self.symbol,
            action_type: self.action_type,
            date: self.date,
            ratio: self.ratio,
            amount: self.amount,
            new_symbol: self.new_symbol,
            currency: self.currency,
            created_at,
        }
    }
}

/// Review state of a corporate action for one portfolio.
///
/// ```text
/// PENDING ─approve→ APPROVED ─apply→ APPLIED
/// PENDING ─reject→ REJECTED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionStatus {
    Pending,
    Approved,
    Rejected,
    Applied,
}

impl ActionStatus {
    pub fn approve(self) -> std::result::Result<ActionStatus, TransitionError> {
        match self {
            ActionStatus::Pending => Ok(ActionStatus::Approved),
            other => Err(TransitionError::NotPending(other)),
        }
    }

    pub fn reject(self) -> std::result::Result<ActionStatus, TransitionError> {
        match self {
            ActionStatus::Pending => Ok(ActionStatus::Rejected),
            other => Err(TransitionError::NotPending(other)),
        }
    }

    pub fn apply(self) -> std::result::Result<ActionStatus, TransitionError> {
        match self {
            ActionStatus::Approved => Ok(ActionStatus::Applied),
            other => Err(TransitionError::NotApproved(other)),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ActionStatus::Rejected | ActionStatus::Applied)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionStatus::Pending => "PENDING",
            ActionStatus::Approved => "APPROVED",
            ActionStatus::Rejected => "REJECTED",
            ActionStatus::Applied => "APPLIED",
        }
    }
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A corporate action detected against one portfolio's holdings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioAction {
    pub id: String,
    pub portfolio_id: String,
    pub corporate_action_id: String,
    pub status: ActionStatus,
    pub affected_symbol: String,
    pub shares_affected: Decimal,
    pub detected_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub applied_at: Option<DateTime<Utc>>,
    pub reviewer_id: Option<String>,
    pub notes: Option<String>,
}

impl PortfolioAction {
    pub fn approve(
        &self,
        reviewer_id: &str,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> std::result::Result<PortfolioAction, CorporateActionError> {
        let status = self
            .status
            .approve()
            .map_err(|e| CorporateActionError::transition(&self.id, e))?;
        Ok(PortfolioAction {
            status,
            reviewed_at: Some(now),
            reviewer_id: Some(reviewer_id.to_string()),
            notes,
            ..self.clone()
        })
    }

    pub fn reject(
        &self,
        reviewer_id: &str,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> std::result::Result<PortfolioAction, CorporateActionError> {
        let status = self
            .status
            .reject()
            .map_err(|e| CorporateActionError::transition(&self.id, e))?;
        Ok(PortfolioAction {
            status,
            reviewed_at: Some(now),
            reviewer_id: Some(reviewer_id.to_string()),
            notes: reason,
            ..self.clone()
        })
    }

    pub fn mark_applied(
        &self,
        now: DateTime<Utc>,
    ) -> std::result::Result<PortfolioAction, CorporateActionError> {
        let status = self
            .status
            .apply()
            .map_err(|e| CorporateActionError::transition(&self.id, e))?;
        Ok(PortfolioAction {
            status,
            applied_at: Some(now),
            reviewed_at: self.reviewed_at.or(Some(now)),
            ..self.clone()
        })
    }
}

/// An applied action joined with its reference data, as replayed by the ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionApplication {
    pub action: PortfolioAction,
    pub corporate_action: CorporateAction,
}

impl ActionApplication {
    /// Application order: action date, then detection time, then id.
    pub fn application_cmp(&self, other: &ActionApplication) -> Ordering {
        self.corporate_action
            .date
            .cmp(&other.corporate_action.date)
            .then_with(|| self.action.detected_at.cmp(&other.action.detected_at))
            .then_with(|| self.action.id.cmp(&other.action.id))
    }
}

/// Outcome of `approve`: the approval always sticks; application may fail
/// and leave the action APPROVED for a later retry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalResult {
    pub action: PortfolioAction,
    pub applied: bool,
    pub application_error: Option<ErrorResponse>,
}
