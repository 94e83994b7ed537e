use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::portfolio::lots::{Allocation, RealizedGain};
use crate::portfolios::CostBasisMethod;
use crate::transactions::LotSelection;

/// A hypothetical sale to preview. Nothing is written.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AllocationPreviewRequest {
    pub symbol: String,
    pub quantity: Decimal,
    /// `FIFO`, `LIFO` or `SPECIFIC_LOT`; defaults to the portfolio's method.
    #[serde(default)]
    pub method: Option<String>,
    /// Defaults to today (UTC).
    #[serde(default)]
    pub sale_date: Option<NaiveDate>,
    /// Sale price used to estimate proceeds and gain.
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub lot_selections: Option<Vec<LotSelection>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PreviewedAllocation {
    #[serde(flatten)]
    pub allocation: Allocation,
    pub estimated_proceeds: Option<Decimal>,
    pub estimated_gain: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AllocationPreview {
    pub symbol: String,
    pub method: CostBasisMethod,
    pub sale_date: NaiveDate,
    pub quantity: Decimal,
    pub allocations: Vec<PreviewedAllocation>,
    pub total_cost_basis: Decimal,
    pub short_term_quantity: Decimal,
    pub long_term_quantity: Decimal,
    pub estimated_proceeds: Option<Decimal>,
    pub estimated_gain: Option<Decimal>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GainSummary {
    pub count: usize,
    pub quantity: Decimal,
    pub proceeds: Decimal,
    pub cost_basis: Decimal,
    pub gain: Decimal,
}

impl GainSummary {
    pub fn add(&mut self, gain: &RealizedGain) {
        self.count += 1;
        self.quantity += gain.quantity;
        self.proceeds += gain.proceeds;
        self.cost_basis += gain.cost_basis;
        self.gain += gain.gain;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaxReport {
    pub portfolio_id: String,
    pub tax_year: i32,
    pub short_term: GainSummary,
    pub long_term: GainSummary,
    pub total_gain: Decimal,
    pub dividend_income: Decimal,
    /// FEE transactions plus commissions paid in the year.
    pub fees_paid: Decimal,
    /// Realized gain rows of the year, by sale date.
    pub gains: Vec<RealizedGain>,
}

/// An open lot trading below its cost by at least the threshold.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HarvestOpportunity {
    pub lot_id: String,
    pub symbol: String,
    pub purchase_date: NaiveDate,
    pub quantity: Decimal,
    pub cost_basis: Decimal,
    pub currency: String,
    pub price: Decimal,
    pub price_date: NaiveDate,
    pub market_value: Decimal,
    pub unrealized_gain: Decimal,
    pub unrealized_gain_pct: Decimal,
    /// `unrealized_gain` in the portfolio's base currency.
    pub unrealized_gain_base: Decimal,
    pub holding_days: i64,
    pub is_long_term: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HarvestReport {
    pub portfolio_id: String,
    pub threshold_pct: Decimal,
    /// Largest loss first.
    pub opportunities: Vec<HarvestOpportunity>,
    /// Sum of the opportunities' losses in base currency.
    pub total_harvestable_loss: Decimal,
    /// Symbols skipped for lack of a quote or FX rate.
    pub unpriced_symbols: Vec<String>,
}
