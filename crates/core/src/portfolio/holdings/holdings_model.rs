use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One row per (portfolio, symbol), reduced from the open lots.
///
/// Carries no timestamps so that rebuilding from the same lots yields
/// byte-identical rows.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Holding {
    pub portfolio_id: String,
    pub symbol: String,
    pub quantity: Decimal,
    pub total_cost_basis: Decimal,
    /// `total_cost_basis / quantity`; null when the quantity is zero.
    pub avg_cost_price: Option<Decimal>,
    pub currency: String,
    pub lot_count: usize,
    pub first_purchase_date: NaiveDate,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MonetaryValue {
    pub local: Decimal,
    pub base: Decimal,
}

impl MonetaryValue {
    pub fn zero() -> Self {
        MonetaryValue {
            local: Decimal::ZERO,
            base: Decimal::ZERO,
        }
    }
}

/// A holding priced with the oracle's latest quote.
///
/// Price-derived fields are null when no quote is available.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValuedHolding {
    #[serde(flatten)]
    pub holding: Holding,
    pub base_currency: String,
    pub price: Option<Decimal>,
    pub price_date: Option<NaiveDate>,
    pub fx_rate_to_base: Option<Decimal>,
    pub market_value: Option<MonetaryValue>,
    pub cost_basis: MonetaryValue,
    pub unrealized_gain: Option<MonetaryValue>,
    pub unrealized_gain_pct: Option<Decimal>,
}

/// Totals over a portfolio's valued holdings, in base currency.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HoldingsSummary {
    pub portfolio_id: String,
    pub base_currency: String,
    pub holdings: Vec<ValuedHolding>,
    pub total_market_value: Decimal,
    pub total_cost_basis: Decimal,
    pub total_unrealized_gain: Decimal,
    /// Symbols without a quote; valued at cost in the totals.
    pub unpriced_symbols: Vec<String>,
}
