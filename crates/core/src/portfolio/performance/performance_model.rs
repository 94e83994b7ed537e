use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::portfolio::valuation::DailyValuation;

/// End-of-day value and the external flow dated that day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValuePoint {
    pub date: NaiveDate,
    pub value: Decimal,
    pub flow: Decimal,
}

impl From<&DailyValuation> for ValuePoint {
    fn from(valuation: &DailyValuation) -> Self {
        ValuePoint {
            date: valuation.valuation_date,
            value: valuation.total_value,
            flow: valuation.external_flow,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubPeriodReturn {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub start_value: Decimal,
    pub end_value: Decimal,
    /// External flow on `end_date`.
    pub flow: Decimal,
    pub rate: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TwrResult {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub twr: Decimal,
    /// Null when no sub-period had a starting value.
    pub annualized_twr: Option<Decimal>,
    /// Calendar days covered by the sub-periods that counted.
    pub days_used: i64,
    pub sub_periods: Vec<SubPeriodReturn>,
    /// Sub-periods dropped because they started at a zero value.
    pub skipped_periods: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MwrResult {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Annual rate; the best estimate when `converged` is false.
    pub rate: Decimal,
    pub converged: bool,
    pub iterations: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnnualizedReturn {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub start_value: Decimal,
    pub end_value: Decimal,
    pub net_deposits: Decimal,
    pub net_withdrawals: Decimal,
    pub years: Decimal,
    /// Null for an empty range or a non-positive starting capital.
    pub annualized_return: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkComparison {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub benchmark_symbol: String,
    pub portfolio_twr: Decimal,
    pub benchmark_twr: Decimal,
    /// `portfolio_twr - benchmark_twr`.
    pub alpha: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReturnData {
    pub date: NaiveDate,
    pub value: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    pub portfolio_id: String,
    pub currency: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub start_value: Decimal,
    pub end_value: Decimal,
    pub net_deposits: Decimal,
    pub net_withdrawals: Decimal,
    /// `end_value - start_value - net flows`.
    pub simple_gain: Decimal,
    pub twr: Decimal,
    pub annualized_twr: Option<Decimal>,
    /// Null when the range has no flows to solve for.
    pub mwr: Option<MwrResult>,
    pub annualized_return: Option<Decimal>,
    /// Annualized standard deviation of daily returns.
    pub volatility: Decimal,
    pub max_drawdown: Decimal,
    /// Cumulative time-weighted return at each day.
    pub returns: Vec<ReturnData>,
}
