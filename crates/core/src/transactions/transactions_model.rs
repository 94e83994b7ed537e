//! Transaction domain models.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use super::transactions_constants::*;
use crate::constants::SYNTHETIC_DIVIDEND_PREFIX;
use crate::errors::{Result, ValidationError};
use crate::portfolios::CostBasisMethod;
use crate::utils::validation::{normalize_currency, normalize_symbol, require_non_empty};

/// Enum representing the supported transaction types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Buy,
    Sell,
    Dividend,
    Deposit,
    Withdrawal,
    Fee,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Buy => TRANSACTION_TYPE_BUY,
            TransactionType::Sell => TRANSACTION_TYPE_SELL,
            TransactionType::Dividend => TRANSACTION_TYPE_DIVIDEND,
            TransactionType::Deposit => TRANSACTION_TYPE_DEPOSIT,
            TransactionType::Withdrawal => TRANSACTION_TYPE_WITHDRAWAL,
            TransactionType::Fee => TRANSACTION_TYPE_FEE,
        }
    }

    /// BUY and SELL touch tax lots; everything else is a cash operation.
    pub fn is_trade(&self) -> bool {
        matches!(self, TransactionType::Buy | TransactionType::Sell)
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            TRANSACTION_TYPE_BUY => Ok(TransactionType::Buy),
            TRANSACTION_TYPE_SELL => Ok(TransactionType::Sell),
            TRANSACTION_TYPE_DIVIDEND => Ok(TransactionType::Dividend),
            TRANSACTION_TYPE_DEPOSIT => Ok(TransactionType::Deposit),
            TRANSACTION_TYPE_WITHDRAWAL => Ok(TransactionType::Withdrawal),
            TRANSACTION_TYPE_FEE => Ok(TransactionType::Fee),
            _ => Err(ValidationError::InvalidInput(format!(
                "Unknown transaction type: {}",
                s
            ))),
        }
    }
}

/// A caller-chosen `(lot, quantity)` pair for SPECIFIC_LOT sales.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LotSelection {
    pub lot_id: String,
    pub quantity: Decimal,
}

/// Domain model representing one event in a portfolio's log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub portfolio_id: String,
    pub transaction_type: TransactionType,
    pub symbol: Option<String>,
    pub date: NaiveDate,
    pub quantity: Decimal,
    pub price: Option<Decimal>,
    pub commission: Decimal,
    pub currency: String,
    pub notes: Option<String>,
    pub import_batch_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lot_selections: Option<Vec<LotSelection>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Gross amount: `quantity × price` when a price is present, otherwise
    /// `quantity` (cash operations recorded as a bare amount).
    pub fn amount(&self) -> Decimal {
        match self.price {
            Some(price) => self.quantity * price,
            None => self.quantity,
        }
    }

    /// Signed effect of this transaction on the portfolio's cash balance.
    pub fn cash_effect(&self) -> Decimal {
        match self.transaction_type {
            TransactionType::Buy => -(self.amount() + self.commission),
            TransactionType::Sell => self.amount() - self.commission,
            TransactionType::Dividend | TransactionType::Deposit => {
                self.amount() - self.commission
            }
            TransactionType::Withdrawal | TransactionType::Fee => {
                -(self.amount() + self.commission)
            }
        }
    }

    /// Signed external flow: deposits positive, withdrawals negative.
    pub fn external_flow(&self) -> Decimal {
        match self.transaction_type {
            TransactionType::Deposit => self.amount(),
            TransactionType::Withdrawal => -self.amount(),
            _ => Decimal::ZERO,
        }
    }

    pub fn symbol_str(&self) -> &str {
        self.symbol.as_deref().unwrap_or("")
    }

    /// Deterministic log order: `(date, created_at, id)`.
    pub fn event_cmp(&self, other: &Transaction) -> Ordering {
        self.date
            .cmp(&other.date)
            .then_with(|| self.created_at.cmp(&other.created_at))
            .then_with(|| self.id.cmp(&other.id))
    }

    /// Whether this row was emitted by a DIVIDEND corporate action.
    pub fn is_synthetic(&self) -> bool {
        self.id.starts_with(SYNTHETIC_DIVIDEND_PREFIX)
    }

    pub fn fingerprint(&self) -> String {
        super::fingerprint::compute_fingerprint(
            &self.portfolio_id,
            self.transaction_type,
            self.symbol.as_deref(),
            self.date,
            self.quantity,
            self.price,
            &self.currency,
        )
    }
}

/// Sorts transactions into the log's deterministic order.
pub fn sort_in_event_order(transactions: &mut [Transaction]) {
    transactions.sort_by(|a, b| a.event_cmp(b));
}

/// Creation stamp for the next event of a portfolio: `now`, bumped past the
/// latest stamp so stamps stay strictly increasing even if the clock stalls.
pub fn next_created_at(latest: Option<DateTime<Utc>>, now: DateTime<Utc>) -> DateTime<Utc> {
    match latest {
        Some(latest) if latest >= now => latest + chrono::Duration::microseconds(1),
        _ => now,
    }
}

/// Lot selections belong to SPECIFIC_LOT sales only, and such sales need them.
pub fn check_lot_selections(
    method: CostBasisMethod,
    transaction_type: TransactionType,
    lot_selections: Option<&[LotSelection]>,
) -> Result<()> {
    match (method, transaction_type, lot_selections) {
        (CostBasisMethod::SpecificLot, TransactionType::Sell, None) => Err(
            ValidationError::MissingField("lotSelections".to_string()).into(),
        ),
        (CostBasisMethod::SpecificLot, TransactionType::Sell, Some([])) => Err(
            ValidationError::MissingField("lotSelections".to_string()).into(),
        ),
        (CostBasisMethod::Fifo | CostBasisMethod::Lifo, _, Some(_)) => {
            Err(ValidationError::InvalidInput(format!(
                "Lot selections require the SPECIFIC_LOT method, portfolio uses {}",
                method
            ))
            .into())
        }
        _ => Ok(()),
    }
}

/// Input model for creating a new transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTransaction {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub transaction_type: TransactionType,
    pub symbol: Option<String>,
    pub date: NaiveDate,
    pub quantity: Decimal,
    pub price: Option<Decimal>,
    #[serde(default)]
    pub commission: Decimal,
    /// Defaults to the portfolio's base currency.
    pub currency: Option<String>,
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lot_selections: Option<Vec<LotSelection>>,
}

impl NewTransaction {
    /// Validates field-level rules and normalizes symbol, currency and notes.
    ///
    /// Ledger rules (open quantity, lot existence) are checked by replay.
    pub fn validate(&mut self, base_currency: &str) -> Result<()> {
        // Cash rows may record a zero amount; trades move shares and open lots.
        let quantity_ok = if self.transaction_type.is_trade() {
            self.quantity > Decimal::ZERO
        } else {
            self.quantity >= Decimal::ZERO
        };
        if !quantity_ok {
            return Err(ValidationError::InvalidInput(format!(
                "Quantity of a {} must be {}, got {}",
                self.transaction_type,
                if self.transaction_type.is_trade() { "positive" } else { "zero or more" },
                self.quantity
            ))
            .into());
        }
        if let Some(price) = self.price {
            if price < Decimal::ZERO {
                return Err(ValidationError::InvalidInput(format!(
                    "Price cannot be negative, got {}",
                    price
                ))
                .into());
            }
        }
        if self.commission < Decimal::ZERO {
            return Err(ValidationError::InvalidInput(format!(
                "Commission cannot be negative, got {}",
                self.commission
            ))
            .into());
        }

        if self.transaction_type.is_trade() {
            if self.price.is_none() {
                return Err(ValidationError::MissingField("price".to_string()).into());
            }
            match self.symbol.as_deref() {
                Some(symbol) if !symbol.trim().is_empty() => {}
                _ => return Err(ValidationError::MissingField("symbol".to_string()).into()),
            }
        }
        self.symbol = match self.symbol.as_deref().map(str::trim) {
            Some("") | None => None,
            Some(symbol) => Some(normalize_symbol(symbol)?),
        };

        self.currency = Some(match self.currency.as_deref() {
            Some(currency) => normalize_currency(currency)?,
            None => normalize_currency(base_currency)?,
        });

        if let Some(selections) = self.lot_selections.as_ref() {
            if self.transaction_type != TransactionType::Sell {
                return Err(ValidationError::InvalidInput(
                    "Lot selections are only allowed on SELL transactions".to_string(),
                )
                .into());
            }
            for selection in selections {
                require_non_empty(&selection.lot_id, "lotSelections.lotId")?;
                if selection.quantity <= Decimal::ZERO {
                    return Err(ValidationError::InvalidInput(format!(
                        "Selected quantity for lot {} must be positive",
                        selection.lot_id
                    ))
                    .into());
                }
            }
        }

        self.notes = self
            .notes
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);
        Ok(())
    }

    /// Builds the stored row. Call after [`NewTransaction::validate`].
    pub fn into_transaction(
        self,
        id: String,
        portfolio_id: &str,
        import_batch_id: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Transaction {
        Transaction {
            id,
            portfolio_id: portfolio_id.to_string(),
            transaction_type: self.transaction_type,
            symbol: self.symbol,
            date: self.date,
            quantity: self.quantity,
            price: self.price,
            commission: self.commission,
            currency: self.currency.unwrap_or_default(),
            notes: self.notes,
            import_batch_id,
            lot_selections: self.lot_selections,
            created_at,
            updated_at: created_at,
        }
    }
}

/// Input model for replacing an existing transaction's fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionUpdate {
    pub id: String,
    pub transaction_type: TransactionType,
    pub symbol: Option<String>,
    pub date: NaiveDate,
    pub quantity: Decimal,
    pub price: Option<Decimal>,
    #[serde(default)]
    pub commission: Decimal,
    pub currency: Option<String>,
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lot_selections: Option<Vec<LotSelection>>,
}

impl TransactionUpdate {
    /// Applies the update to `existing`, keeping identity, batch and creation
    /// stamp so the event keeps its place among same-day events.
    pub fn apply_to(
        self,
        existing: &Transaction,
        base_currency: &str,
        now: DateTime<Utc>,
    ) -> Result<Transaction> {
        require_non_empty(&self.id, "id")?;
        let mut fields = NewTransaction {
            id: Some(self.id),
            transaction_type: self.transaction_type,
            symbol: self.symbol,
            date: self.date,
            quantity: self.quantity,
            price: self.price,
            commission: self.commission,
            currency: self.currency,
            notes: self.notes,
            lot_selections: self.lot_selections,
        };
        fields.validate(base_currency)?;

        let mut updated = fields.into_transaction(
            existing.id.clone(),
            &existing.portfolio_id,
            existing.import_batch_id.clone(),
            existing.created_at,
        );
        updated.updated_at = now;
        Ok(updated)
    }
}

/// Optional filters for listing a portfolio's transactions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionFilter {
    pub symbol: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub transaction_types: Option<Vec<TransactionType>>,
}

impl TransactionFilter {
    pub fn for_symbol(symbol: &str) -> Self {
        Self {
            symbol: Some(symbol.to_string()),
            ..Self::default()
        }
    }

    pub fn validate(&mut self) -> Result<()> {
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err(ValidationError::InvalidDateRange { start, end }.into());
            }
        }
        if let Some(symbol) = self.symbol.as_mut() {
            *symbol = normalize_symbol(symbol)?;
        }
        Ok(())
    }

    pub fn matches(&self, transaction: &Transaction) -> bool {
        if let Some(symbol) = self.symbol.as_deref() {
            if transaction.symbol.as_deref() != Some(symbol) {
                return false;
            }
        }
        if let Some(start) = self.start_date {
            if transaction.date < start {
                return false;
            }
        }
        if let Some(end) = self.end_date {
            if transaction.date > end {
                return false;
            }
        }
        if let Some(types) = self.transaction_types.as_ref() {
            if !types.contains(&transaction.transaction_type) {
                return false;
            }
        }
        true
    }
}
