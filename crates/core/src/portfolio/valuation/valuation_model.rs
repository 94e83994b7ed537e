//! Portfolio valuation domain models.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// End-of-day value of a portfolio, every amount in base currency.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailyValuation {
    pub portfolio_id: String,
    pub valuation_date: NaiveDate,
    pub base_currency: String,
    pub investment_market_value: Decimal,
    pub cash_balance: Decimal,
    /// `investment_market_value + cash_balance`.
    pub total_value: Decimal,
    pub cost_basis: Decimal,
    pub deposits: Decimal,
    pub withdrawals: Decimal,
    /// `deposits - withdrawals` dated this day.
    pub external_flow: Decimal,
    /// Cumulative external flows up to and including this day.
    pub net_contribution: Decimal,
}
