//! Cost-basis allocation.
//!
//! A pure function from open lots and a sale to the lots consumed. Quantities
//! and cost basis are exact decimals: a fully consumed lot gives up its whole
//! cost basis, a partially consumed lot gives up `cost_basis × q / quantity`
//! and keeps the remainder by subtraction, so allocated plus remaining cost
//! always equals the original cost to full precision.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::lots_model::TaxLot;
use crate::errors::LedgerError;
use crate::portfolios::CostBasisMethod;
use crate::transactions::LotSelection;
use crate::utils::decimal_utils::pro_rata;
use crate::utils::time_utils::{days_between, is_long_term};

/// Shares taken from one lot by a sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Allocation {
    pub lot_id: String,
    pub symbol: String,
    pub purchase_date: NaiveDate,
    pub quantity: Decimal,
    pub cost_basis: Decimal,
    pub holding_days: i64,
    pub is_long_term: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AllocationOutcome {
    pub allocations: Vec<Allocation>,
    /// Lots still open after the sale, in FIFO order.
    pub remaining_lots: Vec<TaxLot>,
}

impl AllocationOutcome {
    pub fn allocated_quantity(&self) -> Decimal {
        self.allocations.iter().map(|a| a.quantity).sum()
    }

    pub fn allocated_cost_basis(&self) -> Decimal {
        self.allocations.iter().map(|a| a.cost_basis).sum()
    }
}

/// Orders lots in the sequence a method consumes them.
pub fn sort_lots_for_method(lots: &mut [TaxLot], method: CostBasisMethod) {
    match method {
        CostBasisMethod::Lifo => lots.sort_by(|a, b| b.fifo_cmp(a)),
        CostBasisMethod::Fifo | CostBasisMethod::SpecificLot => lots.sort_by(|a, b| a.fifo_cmp(b)),
    }
}

/// Allocates `sell_quantity` of `symbol` against `open_lots`.
///
/// FIFO consumes oldest first, LIFO newest first. SPECIFIC_LOT follows
/// `selections` in the given order; their total must equal the sale and each
/// selected lot must hold enough shares.
pub fn allocate(
    symbol: &str,
    open_lots: &[TaxLot],
    sell_quantity: Decimal,
    sale_date: NaiveDate,
    method: CostBasisMethod,
    selections: Option<&[LotSelection]>,
) -> Result<AllocationOutcome, LedgerError> {
    if sell_quantity <= Decimal::ZERO {
        return Err(LedgerError::InvalidQuantity(format!(
            "sell quantity must be positive, got {}",
            sell_quantity
        )));
    }

    let available: Decimal = open_lots.iter().map(|lot| lot.quantity).sum();
    if available < sell_quantity {
        return Err(LedgerError::InsufficientShares {
            symbol: symbol.to_string(),
            date: sale_date,
            requested: sell_quantity,
            available,
        });
    }

    let mut lots: Vec<TaxLot> = open_lots.to_vec();
    let plan: Vec<(usize, Decimal)> = match method {
        CostBasisMethod::Fifo | CostBasisMethod::Lifo => {
            sort_lots_for_method(&mut lots, method);
            plan_in_order(&lots, sell_quantity)
        }
        CostBasisMethod::SpecificLot => {
            let selections = selections.ok_or(LedgerError::LotSelectionRequired)?;
            plan_from_selections(symbol, &lots, sell_quantity, sale_date, selections)?
        }
    };

    let mut allocations = Vec::with_capacity(plan.len());
    for (index, quantity) in plan {
        let lot = &mut lots[index];
        let cost_basis = if quantity == lot.quantity {
            lot.cost_basis
        } else {
            pro_rata(lot.cost_basis, quantity, lot.quantity).ok_or_else(|| {
                LedgerError::Overflow(format!("cost basis of lot {}", lot.id))
            })?
        };

        allocations.push(Allocation {
            lot_id: lot.id.clone(),
            symbol: lot.symbol.clone(),
            purchase_date: lot.purchase_date,
            quantity,
            cost_basis,
            holding_days: days_between(lot.purchase_date, sale_date),
            is_long_term: is_long_term(lot.purchase_date, sale_date),
        });

        lot.quantity -= quantity;
        lot.cost_basis -= cost_basis;
    }

    let mut remaining_lots: Vec<TaxLot> = lots.into_iter().filter(TaxLot::is_open).collect();
    remaining_lots.sort_by(|a, b| a.fifo_cmp(b));

    log::debug!(
        "Allocated {} {} across {} lot(s) using {}",
        sell_quantity,
        symbol,
        allocations.len(),
        method
    );

    Ok(AllocationOutcome {
        allocations,
        remaining_lots,
    })
}

/// Walks pre-sorted lots, taking as much as needed from each.
fn plan_in_order(lots: &[TaxLot], sell_quantity: Decimal) -> Vec<(usize, Decimal)> {
    let mut plan = Vec::new();
    let mut remaining = sell_quantity;
    for (index, lot) in lots.iter().enumerate() {
        if remaining.is_zero() {
            break;
        }
        if !lot.is_open() {
            continue;
        }
        let take = remaining.min(lot.quantity);
        plan.push((index, take));
        remaining -= take;
    }
    plan
}

fn plan_from_selections(
    symbol: &str,
    lots: &[TaxLot],
    sell_quantity: Decimal,
    sale_date: NaiveDate,
    selections: &[LotSelection],
) -> Result<Vec<(usize, Decimal)>, LedgerError> {
    // Repeated lot ids are merged so each lot yields one allocation.
    let mut merged: Vec<(String, Decimal)> = Vec::new();
    for selection in selections {
        match merged.iter_mut().find(|(id, _)| *id == selection.lot_id) {
            Some((_, quantity)) => *quantity += selection.quantity,
            None => merged.push((selection.lot_id.clone(), selection.quantity)),
        }
    }

    let selected: Decimal = merged.iter().map(|(_, q)| *q).sum();
    if selected != sell_quantity {
        return Err(LedgerError::LotSelectionMismatch {
            selected,
            requested: sell_quantity,
        });
    }

    let mut plan = Vec::with_capacity(merged.len());
    for (lot_id, quantity) in merged {
        if quantity <= Decimal::ZERO {
            return Err(LedgerError::InvalidQuantity(format!(
                "selected quantity for lot {} must be positive",
                lot_id
            )));
        }
        let index = lots
            .iter()
            .position(|lot| lot.id == lot_id && lot.is_open())
            .ok_or_else(|| LedgerError::LotNotFound {
                lot_id: lot_id.clone(),
            })?;
        if lots[index].quantity < quantity {
            return Err(LedgerError::InsufficientShares {
                symbol: symbol.to_string(),
                date: sale_date,
                requested: quantity,
                available: lots[index].quantity,
            });
        }
        plan.push((index, quantity));
    }
    Ok(plan)
}
