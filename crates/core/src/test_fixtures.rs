//! Builders shared by unit tests.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};

use crate::corporate_actions::{
    ActionApplication, ActionStatus, CorporateAction, CorporateActionType, PortfolioAction,
};
use crate::errors::Result;
use crate::market_data::{MarketDataError, PriceOracle, Quote};
use crate::portfolios::{CostBasisMethod, Portfolio};
use crate::transactions::{LotSelection, Transaction, TransactionType};

pub fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

pub fn ts(seq: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + seq, 0).unwrap()
}

pub fn portfolio(method: CostBasisMethod) -> Portfolio {
    Portfolio {
        id: "p1".to_string(),
        owner_id: "owner".to_string(),
        name: "Main".to_string(),
        base_currency: "USD".to_string(),
        cost_basis_method: method,
        created_at: ts(0),
        updated_at: ts(0),
    }
}

pub fn tx(
    id: &str,
    transaction_type: TransactionType,
    symbol: Option<&str>,
    date: NaiveDate,
    quantity: Decimal,
    price: Option<Decimal>,
) -> Transaction {
    Transaction {
        id: id.to_string(),
        portfolio_id: "p1".to_string(),
        transaction_type,
        symbol: symbol.map(str::to_string),
        date,
        quantity,
        price,
        commission: Decimal::ZERO,
        currency: "USD".to_string(),
        notes: None,
        import_batch_id: None,
        lot_selections: None,
        created_at: date.and_hms_opt(12, 0, 0).unwrap().and_utc(),
        updated_at: date.and_hms_opt(12, 0, 0).unwrap().and_utc(),
    }
}

pub fn buy(id: &str, symbol: &str, date: NaiveDate, quantity: Decimal, price: Decimal) -> Transaction {
    tx(id, TransactionType::Buy, Some(symbol), date, quantity, Some(price))
}

pub fn sell(id: &str, symbol: &str, date: NaiveDate, quantity: Decimal, price: Decimal) -> Transaction {
    tx(id, TransactionType::Sell, Some(symbol), date, quantity, Some(price))
}

pub fn cash(id: &str, transaction_type: TransactionType, date: NaiveDate, amount: Decimal) -> Transaction {
    tx(id, transaction_type, None, date, amount, None)
}

pub fn with_commission(mut transaction: Transaction, commission: Decimal) -> Transaction {
    transaction.commission = commission;
    transaction
}

pub fn with_selections(mut transaction: Transaction, selections: &[(&str, Decimal)]) -> Transaction {
    transaction.lot_selections = Some(
        selections
            .iter()
            .map(|(lot_id, quantity)| LotSelection {
                lot_id: lot_id.to_string(),
                quantity: *quantity,
            })
            .collect(),
    );
    transaction
}

pub fn corporate_action(
    id: &str,
    symbol: &str,
    action_type: CorporateActionType,
    date: NaiveDate,
    ratio: Option<Decimal>,
    amount: Option<Decimal>,
    new_symbol: Option<&str>,
) -> CorporateAction {
    CorporateAction {
        id: id.to_string(),
        symbol: symbol.to_string(),
        action_type,
        date,
        ratio,
        amount,
        new_symbol: new_symbol.map(str::to_string),
        currency: Some("USD".to_string()),
        created_at: ts(0),
    }
}

pub fn pending_action(id: &str, corporate_action: &CorporateAction, shares: Decimal) -> PortfolioAction {
    PortfolioAction {
        id: id.to_string(),
        portfolio_id: "p1".to_string(),
        corporate_action_id: corporate_action.id.clone(),
        status: ActionStatus::Pending,
        affected_symbol: corporate_action.symbol.clone(),
        shares_affected: shares,
        detected_at: ts(10),
        reviewed_at: None,
        applied_at: None,
        reviewer_id: None,
        notes: None,
    }
}

pub fn applied(corporate_action: CorporateAction) -> ActionApplication {
    let mut action = pending_action(&format!("pa-{}", corporate_action.id), &corporate_action, Decimal::ZERO);
    action.status = ActionStatus::Applied;
    action.reviewed_at = Some(ts(11));
    action.applied_at = Some(ts(12));
    ActionApplication {
        action,
        corporate_action,
    }
}

/// Oracle backed by literal closes; FX pairs without a rate fail.
#[derive(Default)]
pub struct TableOracle {
    closes: HashMap<String, BTreeMap<NaiveDate, Decimal>>,
    currencies: HashMap<String, String>,
    rates: HashMap<(String, String), Decimal>,
}

impl TableOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn close(mut self, symbol: &str, date: NaiveDate, close: Decimal) -> Self {
        self.closes
            .entry(symbol.to_string())
            .or_default()
            .insert(date, close);
        self
    }

    pub fn currency(mut self, symbol: &str, currency: &str) -> Self {
        self.currencies
            .insert(symbol.to_string(), currency.to_string());
        self
    }

    pub fn rate(mut self, from: &str, to: &str, rate: Decimal) -> Self {
        self.rates.insert((from.to_string(), to.to_string()), rate);
        self
    }

    fn quote_for(&self, symbol: &str, date: NaiveDate, close: Decimal) -> Quote {
        Quote {
            symbol: symbol.to_string(),
            date,
            close,
            currency: self
                .currencies
                .get(symbol)
                .cloned()
                .unwrap_or_else(|| "USD".to_string()),
        }
    }
}

impl PriceOracle for TableOracle {
    fn quote(&self, symbol: &str) -> Result<Quote> {
        self.closes
            .get(symbol)
            .and_then(|series| series.iter().next_back())
            .map(|(date, close)| self.quote_for(symbol, *date, *close))
            .ok_or_else(|| MarketDataError::QuoteNotFound(symbol.to_string()).into())
    }

    fn historical(&self, symbol: &str, from: NaiveDate, to: NaiveDate) -> Result<Vec<Quote>> {
        Ok(self
            .closes
            .get(symbol)
            .map(|series| {
                series
                    .range(from..=to)
                    .map(|(date, close)| self.quote_for(symbol, *date, *close))
                    .collect()
            })
            .unwrap_or_default())
    }

    fn fx(&self, from: &str, to: &str, date: NaiveDate) -> Result<Decimal> {
        if from == to {
            return Ok(Decimal::ONE);
        }
        self.rates
            .get(&(from.to_string(), to.to_string()))
            .copied()
            .ok_or_else(|| {
                MarketDataError::FxRateNotFound {
                    from: from.to_string(),
                    to: to.to_string(),
                    date,
                }
                .into()
            })
    }
}
