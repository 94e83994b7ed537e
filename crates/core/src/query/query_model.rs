use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::portfolio::holdings::HoldingsSummary;
use crate::portfolio::lots::RealizedGain;
use crate::portfolio::snapshot::PerformanceSnapshot;
use crate::portfolios::Portfolio;
use crate::utils::time_utils::is_in_year;

/// Filters for realized gains. Empty filters match everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GainQuery {
    #[serde(default)]
    pub symbol: Option<String>,
    /// Sale year.
    #[serde(default)]
    pub year: Option<i32>,
}

impl GainQuery {
    pub fn matches(&self, gain: &RealizedGain) -> bool {
        self.symbol.as_deref().map_or(true, |s| gain.symbol == s)
            && self.year.map_or(true, |y| is_in_year(gain.sale_date, y))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RealizedGainTotals {
    pub count: usize,
    pub proceeds: Decimal,
    pub cost_basis: Decimal,
    pub gain: Decimal,
    pub short_term_gain: Decimal,
    pub long_term_gain: Decimal,
}

impl RealizedGainTotals {
    pub fn from_gains(gains: &[RealizedGain]) -> Self {
        gains.iter().fold(Self::default(), |mut totals, gain| {
            totals.count += 1;
            totals.proceeds += gain.proceeds;
            totals.cost_basis += gain.cost_basis;
            totals.gain += gain.gain;
            if gain.is_long_term {
                totals.long_term_gain += gain.gain;
            } else {
                totals.short_term_gain += gain.gain;
            }
            totals
        })
    }
}

/// One-call summary of a portfolio for its owner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioOverview {
    pub portfolio: Portfolio,
    pub holdings: HoldingsSummary,
    pub open_lot_count: usize,
    pub realized: RealizedGainTotals,
    pub latest_snapshot: Option<PerformanceSnapshot>,
}
