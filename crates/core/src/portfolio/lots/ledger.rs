//! Tax-lot ledger.
//!
//! Applies a portfolio's events, in log order, to per-symbol collections of
//! open lots. BUY opens a lot, SELL delegates to the allocator and records
//! realized gains, corporate actions reshape lots. Cash operations only matter
//! for performance and leave lots untouched.

use rust_decimal::Decimal;
use std::collections::BTreeMap;

use super::allocator::{allocate, Allocation};
use super::lots_model::{DerivedState, RealizedGain, TaxLot};
use crate::corporate_actions::{CorporateAction, CorporateActionType};
use crate::errors::LedgerError;
use crate::event_store::LedgerEvent;
use crate::portfolios::CostBasisMethod;
use crate::transactions::{Transaction, TransactionType};
use crate::utils::decimal_utils::pro_rata;

type LedgerResult<T> = std::result::Result<T, LedgerError>;

/// In-memory ledger state for one portfolio.
#[derive(Debug, Clone)]
pub struct TaxLotLedger {
    portfolio_id: String,
    method: CostBasisMethod,
    lots: BTreeMap<String, Vec<TaxLot>>,
    realized_gains: Vec<RealizedGain>,
}

impl TaxLotLedger {
    pub fn new(portfolio_id: &str, method: CostBasisMethod) -> Self {
        Self {
            portfolio_id: portfolio_id.to_string(),
            method,
            lots: BTreeMap::new(),
            realized_gains: Vec::new(),
        }
    }

    /// Replays an ordered event log from an empty ledger.
    pub fn replay(
        portfolio_id: &str,
        method: CostBasisMethod,
        events: &[LedgerEvent<'_>],
    ) -> LedgerResult<DerivedState> {
        Ok(Self::from_events(portfolio_id, method, events)?.into_state())
    }

    /// Builds a ledger from an ordered event log, keeping it open for
    /// further events.
    pub fn from_events(
        portfolio_id: &str,
        method: CostBasisMethod,
        events: &[LedgerEvent<'_>],
    ) -> LedgerResult<Self> {
        let mut ledger = Self::new(portfolio_id, method);
        for event in events {
            ledger.apply(event)?;
        }
        Ok(ledger)
    }

    pub fn apply(&mut self, event: &LedgerEvent<'_>) -> LedgerResult<()> {
        match event {
            LedgerEvent::Transaction(tx) => self.apply_transaction(tx),
            LedgerEvent::CorporateAction(app) => self.apply_corporate_action(&app.corporate_action),
        }
    }

    pub fn apply_transaction(&mut self, tx: &Transaction) -> LedgerResult<()> {
        match tx.transaction_type {
            TransactionType::Buy => self.apply_buy(tx),
            TransactionType::Sell => self.apply_sell(tx),
            TransactionType::Dividend
            | TransactionType::Deposit
            | TransactionType::Withdrawal
            | TransactionType::Fee => Ok(()),
        }
    }

    fn apply_buy(&mut self, tx: &Transaction) -> LedgerResult<()> {
        let symbol = required_symbol(tx)?;
        let price = tx.price.unwrap_or(Decimal::ZERO);
        let cost_basis = tx
            .quantity
            .checked_mul(price)
            .and_then(|gross| gross.checked_add(tx.commission))
            .ok_or_else(|| LedgerError::Overflow(format!("cost basis of {}", tx.id)))?;

        self.lots.entry(symbol.to_string()).or_default().push(TaxLot {
            id: tx.id.clone(),
            portfolio_id: self.portfolio_id.clone(),
            symbol: symbol.to_string(),
            purchase_date: tx.date,
            quantity: tx.quantity,
            cost_basis,
            currency: tx.currency.clone(),
            source_transaction_id: tx.id.clone(),
            created_at: tx.created_at,
        });
        Ok(())
    }

    fn apply_sell(&mut self, tx: &Transaction) -> LedgerResult<()> {
        let symbol = required_symbol(tx)?;
        let open = self.lots.get(symbol).map(Vec::as_slice).unwrap_or(&[]);
        let selections = match self.method {
            CostBasisMethod::SpecificLot => tx.lot_selections.as_deref(),
            CostBasisMethod::Fifo | CostBasisMethod::Lifo => None,
        };
        let outcome = allocate(symbol, open, tx.quantity, tx.date, self.method, selections)?;

        let price = tx.price.unwrap_or(Decimal::ZERO);
        let gains = self.realize(tx, price, &outcome.allocations)?;
        self.realized_gains.extend(gains);

        if outcome.remaining_lots.is_empty() {
            self.lots.remove(symbol);
        } else {
            self.lots.insert(symbol.to_string(), outcome.remaining_lots);
        }
        Ok(())
    }

    /// Turns allocations into gain rows. The sale's commission is spread by
    /// quantity and the last allocation takes whatever is left, so the shares
    /// always add up to the commission exactly.
    fn realize(
        &self,
        tx: &Transaction,
        price: Decimal,
        allocations: &[Allocation],
    ) -> LedgerResult<Vec<RealizedGain>> {
        let mut gains = Vec::with_capacity(allocations.len());
        let mut commission_left = tx.commission;
        let last = allocations.len().saturating_sub(1);

        for (i, alloc) in allocations.iter().enumerate() {
            let commission_share = if i == last {
                commission_left
            } else {
                pro_rata(tx.commission, alloc.quantity, tx.quantity).ok_or_else(|| {
                    LedgerError::Overflow(format!("commission share of {}", tx.id))
                })?
            };
            commission_left -= commission_share;

            let proceeds = alloc
                .quantity
                .checked_mul(price)
                .map(|gross| gross - commission_share)
                .ok_or_else(|| LedgerError::Overflow(format!("proceeds of {}", tx.id)))?;

            gains.push(RealizedGain {
                id: RealizedGain::make_id(&tx.id, &alloc.lot_id),
                portfolio_id: self.portfolio_id.clone(),
                sale_transaction_id: tx.id.clone(),
                lot_id: alloc.lot_id.clone(),
                symbol: alloc.symbol.clone(),
                purchase_date: alloc.purchase_date,
                sale_date: tx.date,
                quantity: alloc.quantity,
                cost_basis: alloc.cost_basis,
                proceeds,
                gain: proceeds - alloc.cost_basis,
                is_long_term: alloc.is_long_term,
                currency: tx.currency.clone(),
            });
        }
        Ok(gains)
    }

    /// Applies a SPLIT or MERGER to the lots open at the action's date.
    /// DIVIDEND actions are represented by a synthetic transaction instead.
    pub fn apply_corporate_action(&mut self, action: &CorporateAction) -> LedgerResult<()> {
        match action.action_type {
            CorporateActionType::Split => {
                let ratio = action.ratio_or_zero();
                if let Some(lots) = self.lots.get_mut(&action.symbol) {
                    for lot in lots.iter_mut().filter(|l| l.purchase_date <= action.date) {
                        lot.quantity = scale_quantity(lot, ratio)?;
                    }
                }
                Ok(())
            }
            CorporateActionType::Merger => {
                let ratio = action.ratio_or_zero();
                let new_symbol = action.new_symbol.clone().unwrap_or_default();
                let Some(lots) = self.lots.remove(&action.symbol) else {
                    return Ok(());
                };

                let (affected, untouched): (Vec<TaxLot>, Vec<TaxLot>) = lots
                    .into_iter()
                    .partition(|lot| lot.purchase_date <= action.date);
                if !untouched.is_empty() {
                    self.lots.insert(action.symbol.clone(), untouched);
                }

                let target = self.lots.entry(new_symbol.clone()).or_default();
                for mut lot in affected {
                    lot.quantity = scale_quantity(&lot, ratio)?;
                    lot.symbol = new_symbol.clone();
                    target.push(lot);
                }
                Ok(())
            }
            CorporateActionType::Dividend => Ok(()),
        }
    }

    pub fn method(&self) -> CostBasisMethod {
        self.method
    }

    pub fn open_lots(&self, symbol: &str) -> &[TaxLot] {
        self.lots.get(symbol).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn open_quantity(&self, symbol: &str) -> Decimal {
        self.open_lots(symbol).iter().map(|lot| lot.quantity).sum()
    }

    /// `(symbol, quantity, cost_basis, currency)` per open position.
    pub fn positions(&self) -> Vec<(String, Decimal, Decimal, String)> {
        self.lots
            .iter()
            .filter(|(_, lots)| !lots.is_empty())
            .map(|(symbol, lots)| {
                let quantity = lots.iter().map(|l| l.quantity).sum();
                let cost = lots.iter().map(|l| l.cost_basis).sum();
                let currency = lots.first().map(|l| l.currency.clone()).unwrap_or_default();
                (symbol.clone(), quantity, cost, currency)
            })
            .collect()
    }

    pub fn realized_gains(&self) -> &[RealizedGain] {
        &self.realized_gains
    }

    pub fn into_state(self) -> DerivedState {
        let mut lots: Vec<TaxLot> = self
            .lots
            .into_values()
            .flatten()
            .filter(TaxLot::is_open)
            .collect();
        lots.sort_by(|a, b| a.symbol.cmp(&b.symbol).then_with(|| a.fifo_cmp(b)));
        DerivedState {
            lots,
            realized_gains: self.realized_gains,
        }
    }
}

fn required_symbol(tx: &Transaction) -> LedgerResult<&str> {
    match tx.symbol.as_deref() {
        Some(symbol) if !symbol.is_empty() => Ok(symbol),
        _ => Err(LedgerError::InvalidQuantity(format!(
            "{} transaction {} has no symbol",
            tx.transaction_type, tx.id
        ))),
    }
}

fn scale_quantity(lot: &TaxLot, ratio: Decimal) -> LedgerResult<Decimal> {
    lot.quantity
        .checked_mul(ratio)
        .ok_or_else(|| LedgerError::Overflow(format!("quantity of lot {}", lot.id)))
}
