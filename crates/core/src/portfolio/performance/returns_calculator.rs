//! Time-weighted returns and the risk metrics derived from daily returns.

use log::debug;
use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;

use super::performance_model::{ReturnData, SubPeriodReturn, TwrResult, ValuePoint};
use crate::constants::{DAYS_PER_YEAR, TRADING_DAYS_PER_YEAR};
use crate::errors::{PerformanceError, Result};
use crate::utils::decimal_utils::pow;
use crate::utils::time_utils::days_between;
use crate::utils::Deadline;

const SQRT_TRADING_DAYS_APPROX: Decimal = dec!(15.874507866);

/// `(1 + total)^(365 / days) - 1`; a total loss stays at -1.
pub fn annualize(total_return: Decimal, days: i64) -> Option<Decimal> {
    if days <= 0 {
        return None;
    }
    if total_return <= Decimal::NEGATIVE_ONE {
        return Some(Decimal::NEGATIVE_ONE);
    }
    let exponent = DAYS_PER_YEAR.checked_div(Decimal::from(days))?;
    pow(Decimal::ONE + total_return, exponent).map(|growth| growth - Decimal::ONE)
}

/// Time-weighted return over `points`, split at every day with an external
/// flow.
///
/// A flow closes the sub-period ending on its day: `r = (E - B - F) / B`, and
/// the next sub-period starts from that day's value. Sub-periods starting at
/// a non-positive value are skipped and their days leave the annualization.
pub fn calculate_twr(points: &[ValuePoint], deadline: &Deadline) -> Result<TwrResult> {
    let (first, last) = match (points.first(), points.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => {
            return Err(PerformanceError::InsufficientData(
                "no valuations in the requested range".to_string(),
            )
            .into())
        }
    };

    let mut boundaries: Vec<usize> = vec![0];
    boundaries.extend((1..points.len()).filter(|&i| !points[i].flow.is_zero()));
    if *boundaries.last().unwrap_or(&0) != points.len() - 1 {
        boundaries.push(points.len() - 1);
    }

    let mut growth = Decimal::ONE;
    let mut days_used = 0;
    let mut skipped_periods = 0;
    let mut sub_periods = Vec::new();
    for window in boundaries.windows(2) {
        deadline.check("time-weighted return")?;
        let (begin, end) = (&points[window[0]], &points[window[1]]);
        if begin.value <= Decimal::ZERO {
            debug!(
                "Skipping sub-period {} to {}: starting value {}",
                begin.date, end.date, begin.value
            );
            skipped_periods += 1;
            continue;
        }
        let rate = (end.value - begin.value - end.flow) / begin.value;
        growth *= Decimal::ONE + rate;
        days_used += days_between(begin.date, end.date);
        sub_periods.push(SubPeriodReturn {
            start_date: begin.date,
            end_date: end.date,
            start_value: begin.value,
            end_value: end.value,
            flow: end.flow,
            rate,
        });
    }

    let twr = growth - Decimal::ONE;
    let annualized_twr = if sub_periods.is_empty() {
        None
    } else {
        annualize(twr, days_used)
    };

    Ok(TwrResult {
        start_date: first.date,
        end_date: last.date,
        twr,
        annualized_twr,
        days_used,
        sub_periods,
        skipped_periods,
    })
}

/// Flow-adjusted return of each day against the previous day's value.
/// Days following a non-positive value are left out.
pub fn daily_returns(points: &[ValuePoint]) -> Vec<Decimal> {
    points
        .windows(2)
        .filter(|pair| pair[0].value > Decimal::ZERO)
        .map(|pair| (pair[1].value - pair[0].value - pair[1].flow) / pair[0].value)
        .collect()
}

/// Compounded daily returns as of each day; the first day is zero.
pub fn cumulative_returns(points: &[ValuePoint]) -> Vec<ReturnData> {
    let mut growth = Decimal::ONE;
    let mut returns = Vec::with_capacity(points.len());
    for (i, point) in points.iter().enumerate() {
        if i > 0 && points[i - 1].value > Decimal::ZERO {
            let previous = points[i - 1].value;
            growth *= Decimal::ONE + (point.value - previous - point.flow) / previous;
        }
        returns.push(ReturnData {
            date: point.date,
            value: growth - Decimal::ONE,
        });
    }
    returns
}

/// Sample standard deviation of daily returns scaled to a trading year.
pub fn calculate_volatility(daily_returns: &[Decimal]) -> Decimal {
    if daily_returns.len() < 2 {
        return Decimal::ZERO;
    }

    let count = Decimal::from(daily_returns.len());
    let sum: Decimal = daily_returns.iter().sum();
    let mean = sum / count;

    let sum_squared_diff: Decimal = daily_returns
        .iter()
        .map(|&r| {
            let diff = r - mean;
            diff * diff
        })
        .sum();

    let variance = sum_squared_diff / (count - Decimal::ONE);
    if variance.is_sign_negative() {
        return Decimal::ZERO;
    }

    let daily_volatility = variance.sqrt().unwrap_or(Decimal::ZERO);

    let annualization_factor = Decimal::from(TRADING_DAYS_PER_YEAR)
        .sqrt()
        .unwrap_or(SQRT_TRADING_DAYS_APPROX);

    daily_volatility * annualization_factor
}

/// Largest peak-to-trough decline of the compounded daily returns, as a
/// positive fraction.
pub fn calculate_max_drawdown(daily_returns: &[Decimal]) -> Decimal {
    if daily_returns.is_empty() {
        return Decimal::ZERO;
    }

    let mut cumulative_value = Decimal::ONE;
    let mut peak_value = Decimal::ONE;
    let mut max_drawdown = Decimal::ZERO;

    for &daily_return in daily_returns {
        cumulative_value *= Decimal::ONE + daily_return;
        peak_value = peak_value.max(cumulative_value);
        if peak_value.is_zero() {
            max_drawdown = max_drawdown.max(Decimal::ONE);
        } else {
            let drawdown = (peak_value - cumulative_value) / peak_value;
            max_drawdown = max_drawdown.max(drawdown);
        }
    }

    max_drawdown.max(Decimal::ZERO)
}

/// `((V_end + withdrawals) / (V_start + deposits))^(365 / days) - 1`.
///
/// Null for an empty range or when the starting capital is not positive.
pub fn calculate_annualized_return(
    start_value: Decimal,
    end_value: Decimal,
    net_deposits: Decimal,
    net_withdrawals: Decimal,
    days: i64,
) -> Option<Decimal> {
    if days <= 0 {
        return None;
    }
    let invested = start_value + net_deposits;
    if invested <= Decimal::ZERO {
        return None;
    }
    let ratio = (end_value + net_withdrawals).checked_div(invested)?;
    if ratio <= Decimal::ZERO {
        return Some(Decimal::NEGATIVE_ONE);
    }
    let exponent = DAYS_PER_YEAR.checked_div(Decimal::from(days))?;
    pow(ratio, exponent).map(|growth| growth - Decimal::ONE)
}
