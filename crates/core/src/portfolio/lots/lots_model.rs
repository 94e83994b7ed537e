//! Tax lot and realized gain models.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// One acquisition unit of a symbol. The id equals the source BUY's id, so it
/// is stable across replays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxLot {
    pub id: String,
    pub portfolio_id: String,
    pub symbol: String,
    pub purchase_date: NaiveDate,
    pub quantity: Decimal,
    /// `quantity × price + commission` at purchase, shrunk only by sales.
    pub cost_basis: Decimal,
    pub currency: String,
    pub source_transaction_id: String,
    pub created_at: DateTime<Utc>,
}

impl TaxLot {
    /// Per-share cost; `None` for an empty lot.
    pub fn cost_per_share(&self) -> Option<Decimal> {
        if self.quantity.is_zero() {
            return None;
        }
        self.cost_basis.checked_div(self.quantity)
    }

    pub fn is_open(&self) -> bool {
        self.quantity > Decimal::ZERO
    }

    /// FIFO order: `(purchase_date, created_at, id)` ascending.
    pub fn fifo_cmp(&self, other: &TaxLot) -> Ordering {
        self.purchase_date
            .cmp(&other.purchase_date)
            .then_with(|| self.created_at.cmp(&other.created_at))
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// Gain realized when a sale consumed (part of) one lot. Never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealizedGain {
    /// `"{sale_transaction_id}:{lot_id}"`.
    pub id: String,
    pub portfolio_id: String,
    pub sale_transaction_id: String,
    pub lot_id: String,
    pub symbol: String,
    pub purchase_date: NaiveDate,
    pub sale_date: NaiveDate,
    pub quantity: Decimal,
    pub cost_basis: Decimal,
    pub proceeds: Decimal,
    pub gain: Decimal,
    pub is_long_term: bool,
    pub currency: String,
}

impl RealizedGain {
    pub fn make_id(sale_transaction_id: &str, lot_id: &str) -> String {
        format!("{}:{}", sale_transaction_id, lot_id)
    }
}

/// Everything the ledger derives from a portfolio's event log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedState {
    /// Open lots ordered by `(symbol, purchase_date, created_at, id)`.
    pub lots: Vec<TaxLot>,
    /// Gains of the live sales, in sale order.
    pub realized_gains: Vec<RealizedGain>,
}

impl DerivedState {
    pub fn open_quantity(&self, symbol: &str) -> Decimal {
        self.lots
            .iter()
            .filter(|lot| lot.symbol == symbol)
            .map(|lot| lot.quantity)
            .sum()
    }
}
