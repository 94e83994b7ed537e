//! Snapshot domain models.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::ErrorResponse;
use crate::portfolio::valuation::DailyValuation;
use crate::utils::decimal_utils::{percent_of, round_metric};

/// End-of-day performance record; at most one per (portfolio, date) and
/// never rewritten.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceSnapshot {
    pub portfolio_id: String,
    pub date: NaiveDate,
    pub total_value: Decimal,
    pub total_cost_basis: Decimal,
    /// `total_value - net_contributions`.
    pub total_return: Decimal,
    /// Percent of net contributions, or of cost basis when nothing was
    /// contributed; null when both are zero.
    pub total_return_pct: Option<Decimal>,
    pub cash_flow_of_day: Decimal,
    pub net_contributions: Decimal,
    pub cash_balance: Decimal,
    pub created_at: DateTime<Utc>,
}

impl PerformanceSnapshot {
    pub fn from_valuation(valuation: &DailyValuation, created_at: DateTime<Utc>) -> Self {
        let total_return = valuation.total_value - valuation.net_contribution;
        let denominator = if valuation.net_contribution > Decimal::ZERO {
            valuation.net_contribution
        } else {
            valuation.cost_basis
        };
        let total_return_pct = if denominator > Decimal::ZERO {
            percent_of(total_return, denominator).map(round_metric)
        } else {
            None
        };
        PerformanceSnapshot {
            portfolio_id: valuation.portfolio_id.clone(),
            date: valuation.valuation_date,
            total_value: valuation.total_value,
            total_cost_basis: valuation.cost_basis,
            total_return,
            total_return_pct,
            cash_flow_of_day: valuation.external_flow,
            net_contributions: valuation.net_contribution,
            cash_balance: valuation.cash_balance,
            created_at,
        }
    }
}

/// One page of a portfolio's snapshots, newest first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotPage {
    pub snapshots: Vec<PerformanceSnapshot>,
    pub limit: usize,
    pub offset: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotFailure {
    pub portfolio_id: String,
    pub error: ErrorResponse,
}

/// Outcome of one run of the daily snapshotter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailySnapshotReport {
    pub date: NaiveDate,
    /// Portfolios that got a new snapshot.
    pub taken: Vec<String>,
    /// Portfolios that already had one for the date.
    pub existing: Vec<String>,
    pub failures: Vec<SnapshotFailure>,
}
