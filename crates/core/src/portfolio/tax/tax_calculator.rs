//! Pure tax computations over lots, gains and transactions.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::tax_model::{
    AllocationPreview, GainSummary, HarvestOpportunity, PreviewedAllocation, TaxReport,
};
use crate::constants::DEFAULT_HARVEST_THRESHOLD_PCT;
use crate::errors::{Result, ValidationError};
use crate::market_data::Quote;
use crate::portfolio::lots::{allocate, RealizedGain, TaxLot};
use crate::portfolios::CostBasisMethod;
use crate::transactions::{LotSelection, Transaction, TransactionType};
use crate::utils::decimal_utils::{percent_of, round_metric};
use crate::utils::time_utils::{days_between, is_in_year, is_long_term};

/// Runs the allocator against `open_lots` and prices the result.
pub fn preview_allocation(
    symbol: &str,
    open_lots: &[TaxLot],
    quantity: Decimal,
    sale_date: NaiveDate,
    method: CostBasisMethod,
    selections: Option<&[LotSelection]>,
    price: Option<Decimal>,
) -> Result<AllocationPreview> {
    let outcome = allocate(symbol, open_lots, quantity, sale_date, method, selections)?;

    let mut short_term_quantity = Decimal::ZERO;
    let mut long_term_quantity = Decimal::ZERO;
    let allocations: Vec<PreviewedAllocation> = outcome
        .allocations
        .into_iter()
        .map(|allocation| {
            if allocation.is_long_term {
                long_term_quantity += allocation.quantity;
            } else {
                short_term_quantity += allocation.quantity;
            }
            let estimated_proceeds = price.map(|p| allocation.quantity * p);
            PreviewedAllocation {
                estimated_gain: estimated_proceeds.map(|proceeds| proceeds - allocation.cost_basis),
                estimated_proceeds,
                allocation,
            }
        })
        .collect();

    let total_cost_basis = allocations.iter().map(|a| a.allocation.cost_basis).sum();
    let estimated_proceeds = price.map(|p| quantity * p);
    Ok(AllocationPreview {
        symbol: symbol.to_string(),
        method,
        sale_date,
        quantity,
        estimated_gain: estimated_proceeds.map(|proceeds| proceeds - total_cost_basis),
        estimated_proceeds,
        total_cost_basis,
        short_term_quantity,
        long_term_quantity,
        allocations,
    })
}

/// Summarizes gains of live sales and cash income for `tax_year`.
pub fn build_tax_report(
    portfolio_id: &str,
    tax_year: i32,
    live_gains: &[RealizedGain],
    transactions: &[Transaction],
) -> TaxReport {
    let mut gains: Vec<RealizedGain> = live_gains
        .iter()
        .filter(|gain| is_in_year(gain.sale_date, tax_year))
        .cloned()
        .collect();
    gains.sort_by(|a, b| a.sale_date.cmp(&b.sale_date).then_with(|| a.id.cmp(&b.id)));

    let mut short_term = GainSummary::default();
    let mut long_term = GainSummary::default();
    for gain in &gains {
        if gain.is_long_term {
            long_term.add(gain);
        } else {
            short_term.add(gain);
        }
    }

    let mut dividend_income = Decimal::ZERO;
    let mut fees_paid = Decimal::ZERO;
    for tx in transactions.iter().filter(|tx| is_in_year(tx.date, tax_year)) {
        match tx.transaction_type {
            TransactionType::Dividend => dividend_income += tx.amount(),
            TransactionType::Fee => fees_paid += tx.amount(),
            _ => {}
        }
        fees_paid += tx.commission;
    }

    TaxReport {
        portfolio_id: portfolio_id.to_string(),
        tax_year,
        total_gain: short_term.gain + long_term.gain,
        short_term,
        long_term,
        dividend_income,
        fees_paid,
        gains,
    }
}

/// Resolves and checks a harvest threshold: a signed percent in `[-100, 0]`.
pub fn resolve_harvest_threshold(threshold_pct: Option<Decimal>) -> Result<Decimal> {
    let threshold = threshold_pct.unwrap_or(DEFAULT_HARVEST_THRESHOLD_PCT);
    if threshold < -Decimal::ONE_HUNDRED || threshold > Decimal::ZERO {
        return Err(ValidationError::InvalidThreshold(threshold).into());
    }
    Ok(threshold)
}

/// The lot as a harvest candidate when its return is at or below the
/// threshold. `fx_rate` converts the lot's currency to base.
pub fn harvest_candidate(
    lot: &TaxLot,
    quote: &Quote,
    fx_rate: Decimal,
    threshold_pct: Decimal,
    as_of: NaiveDate,
) -> Option<HarvestOpportunity> {
    if !lot.is_open() || lot.cost_basis <= Decimal::ZERO {
        return None;
    }
    let market_value = lot.quantity * quote.close;
    let unrealized_gain = market_value - lot.cost_basis;
    let unrealized_gain_pct = round_metric(percent_of(unrealized_gain, lot.cost_basis)?);
    if unrealized_gain_pct > threshold_pct || !unrealized_gain.is_sign_negative() {
        return None;
    }
    Some(HarvestOpportunity {
        lot_id: lot.id.clone(),
        symbol: lot.symbol.clone(),
        purchase_date: lot.purchase_date,
        quantity: lot.quantity,
        cost_basis: lot.cost_basis,
        currency: lot.currency.clone(),
        price: quote.close,
        price_date: quote.date,
        market_value,
        unrealized_gain,
        unrealized_gain_pct,
        unrealized_gain_base: unrealized_gain * fx_rate,
        holding_days: days_between(lot.purchase_date, as_of),
        is_long_term: is_long_term(lot.purchase_date, as_of),
    })
}

/// Largest loss first; ties by lot id.
pub fn sort_by_largest_loss(opportunities: &mut [HarvestOpportunity]) {
    opportunities.sort_by(|a, b| {
        a.unrealized_gain_base
            .cmp(&b.unrealized_gain_base)
            .then_with(|| a.lot_id.cmp(&b.lot_id))
    });
}
