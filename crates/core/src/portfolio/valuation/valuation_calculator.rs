use chrono::NaiveDate;
use log::{debug, warn};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::corporate_actions::CorporateActionType;
use crate::errors::Result;
use crate::event_store::{EventLog, LedgerEvent};
use crate::market_data::{PriceOracle, PriceSeries};
use crate::portfolio::lots::TaxLotLedger;
use crate::portfolio::valuation::DailyValuation;
use crate::portfolios::Portfolio;
use crate::utils::time_utils::get_days_between;
use crate::utils::Deadline;

/// Every symbol the log can hold a position in, merger targets included.
pub fn priced_symbols(log: &EventLog) -> Vec<String> {
    let mut symbols: Vec<String> = log
        .transactions
        .iter()
        .filter(|tx| tx.transaction_type.is_trade())
        .filter_map(|tx| tx.symbol.clone())
        .chain(log.applications.iter().filter_map(|app| {
            match app.corporate_action.action_type {
                CorporateActionType::Merger => app.corporate_action.new_symbol.clone(),
                _ => None,
            }
        }))
        .collect();
    symbols.sort();
    symbols.dedup();
    symbols
}

/// Converts `amount` into the base currency on `date`.
fn to_base(
    fx: &dyn PriceOracle,
    amount: Decimal,
    currency: &str,
    base_currency: &str,
    date: NaiveDate,
) -> Result<Decimal> {
    if amount.is_zero() || currency == base_currency {
        return Ok(amount);
    }
    Ok(amount * fx.fx(currency, base_currency, date)?)
}

/// Replays the log day by day and values the portfolio at each end of day in
/// `[start, end]`.
///
/// Positions use the last close on or before the day. A position with no
/// close yet is valued at its cost basis. Cash is held per currency and
/// converted with the oracle's rate for the day.
pub fn calculate_value_series(
    portfolio: &Portfolio,
    log: &EventLog,
    start: NaiveDate,
    end: NaiveDate,
    prices: &HashMap<String, PriceSeries>,
    fx: &dyn PriceOracle,
    deadline: &Deadline,
) -> Result<Vec<DailyValuation>> {
    let events = log.events();
    let mut ledger = TaxLotLedger::new(&portfolio.id, portfolio.cost_basis_method);
    let mut cash: BTreeMap<String, Decimal> = BTreeMap::new();
    let mut net_contribution = Decimal::ZERO;
    let mut warned: HashSet<String> = HashSet::new();
    let mut next = 0;

    // State as of the end of the day before `start`.
    while next < events.len() && events[next].date() < start {
        apply_event(&mut ledger, &mut cash, &events[next])?;
        if let LedgerEvent::Transaction(tx) = &events[next] {
            net_contribution += to_base(
                fx,
                tx.external_flow(),
                &tx.currency,
                &portfolio.base_currency,
                tx.date,
            )?;
        }
        next += 1;
    }

    let days = get_days_between(start, end);
    let mut series = Vec::with_capacity(days.len());
    for day in days {
        deadline.check("portfolio valuation")?;

        let mut deposits = Decimal::ZERO;
        let mut withdrawals = Decimal::ZERO;
        while next < events.len() && events[next].date() == day {
            apply_event(&mut ledger, &mut cash, &events[next])?;
            if let LedgerEvent::Transaction(tx) = &events[next] {
                let flow = to_base(
                    fx,
                    tx.external_flow(),
                    &tx.currency,
                    &portfolio.base_currency,
                    day,
                )?;
                if flow.is_sign_negative() {
                    withdrawals -= flow;
                } else {
                    deposits += flow;
                }
            }
            next += 1;
        }
        let external_flow = deposits - withdrawals;
        net_contribution += external_flow;

        let mut investment_market_value = Decimal::ZERO;
        let mut cost_basis = Decimal::ZERO;
        for (symbol, quantity, position_cost, currency) in ledger.positions() {
            let local_value = match prices
                .get(&symbol)
                .and_then(|series| series.price_on_or_before(day))
            {
                Some(close) => quantity * close,
                None => {
                    if warned.insert(symbol.clone()) {
                        warn!(
                            "No price for {} on or before {} in portfolio {}. Valuing at cost.",
                            symbol, day, portfolio.id
                        );
                    }
                    position_cost
                }
            };
            investment_market_value +=
                to_base(fx, local_value, &currency, &portfolio.base_currency, day)?;
            cost_basis += to_base(fx, position_cost, &currency, &portfolio.base_currency, day)?;
        }

        let mut cash_balance = Decimal::ZERO;
        for (currency, balance) in &cash {
            cash_balance += to_base(fx, *balance, currency, &portfolio.base_currency, day)?;
        }

        series.push(DailyValuation {
            portfolio_id: portfolio.id.clone(),
            valuation_date: day,
            base_currency: portfolio.base_currency.clone(),
            investment_market_value,
            cash_balance,
            total_value: investment_market_value + cash_balance,
            cost_basis,
            deposits,
            withdrawals,
            external_flow,
            net_contribution,
        });
    }

    debug!(
        "Valued portfolio {} over {} day(s) ({} to {})",
        portfolio.id,
        series.len(),
        start,
        end
    );
    Ok(series)
}

fn apply_event(
    ledger: &mut TaxLotLedger,
    cash: &mut BTreeMap<String, Decimal>,
    event: &LedgerEvent<'_>,
) -> Result<()> {
    ledger.apply(event)?;
    if let LedgerEvent::Transaction(tx) = event {
        *cash.entry(tx.currency.clone()).or_insert(Decimal::ZERO) += tx.cash_effect();
    }
    Ok(())
}
