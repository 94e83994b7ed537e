//! Money-weighted return: the annual rate that zeroes the investor's NPV.

use chrono::NaiveDate;
use log::{debug, warn};
use rust_decimal::Decimal;

use super::performance_model::ValuePoint;
use crate::constants::{
    DAYS_PER_YEAR, IRR_INITIAL_GUESS, IRR_LOWER_BOUND, IRR_MAX_ITERATIONS, IRR_MIN_DERIVATIVE,
    IRR_TOLERANCE, IRR_UPPER_BOUND,
};
use crate::errors::Result;
use crate::utils::decimal_utils::pow;
use crate::utils::time_utils::days_between;
use crate::utils::Deadline;

/// A dated amount from the investor's side: money put in is negative.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CashFlow {
    pub date: NaiveDate,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IrrSolution {
    pub rate: Decimal,
    pub converged: bool,
    pub iterations: u32,
}

/// `-V(start)` on the first day, `-CF` on each later flow day, `+V(end)` on
/// the last day.
pub fn investor_flows(points: &[ValuePoint]) -> Vec<CashFlow> {
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return Vec::new();
    };
    let mut flows = vec![CashFlow {
        date: first.date,
        amount: -first.value,
    }];
    flows.extend(
        points
            .iter()
            .skip(1)
            .filter(|point| !point.flow.is_zero())
            .map(|point| CashFlow {
                date: point.date,
                amount: -point.flow,
            }),
    );
    flows.push(CashFlow {
        date: last.date,
        amount: last.value,
    });
    flows
}

struct NpvFunction<'a> {
    /// `(amount, years until the end)` per flow.
    terms: Vec<(Decimal, Decimal)>,
    flows: &'a [CashFlow],
}

impl<'a> NpvFunction<'a> {
    fn new(flows: &'a [CashFlow], end: NaiveDate) -> Option<Self> {
        let terms = flows
            .iter()
            .map(|flow| {
                let years =
                    Decimal::from(days_between(flow.date, end)).checked_div(DAYS_PER_YEAR)?;
                Some((flow.amount, years))
            })
            .collect::<Option<Vec<_>>>()?;
        Some(Self { terms, flows })
    }

    /// `Σ a·(1+r)^t`, or `None` when a term leaves the decimal range.
    fn value(&self, rate: Decimal) -> Option<Decimal> {
        let base = Decimal::ONE + rate;
        self.terms.iter().try_fold(Decimal::ZERO, |acc, (amount, years)| {
            acc.checked_add(amount.checked_mul(pow(base, *years)?)?)
        })
    }

    /// `Σ a·t·(1+r)^(t-1)`.
    fn derivative(&self, rate: Decimal) -> Option<Decimal> {
        let base = Decimal::ONE + rate;
        self.terms.iter().try_fold(Decimal::ZERO, |acc, (amount, years)| {
            let growth = pow(base, *years)?.checked_div(base)?;
            acc.checked_add(amount.checked_mul(*years)?.checked_mul(growth)?)
        })
    }

    fn scale(&self) -> Decimal {
        self.flows
            .iter()
            .map(|flow| flow.amount.abs())
            .sum::<Decimal>()
            .max(Decimal::ONE)
    }
}

/// Keeps the rate with the smallest residual seen so far.
fn track(rate: Decimal, f: Decimal, best: &mut Option<(Decimal, Decimal)>) {
    if best.map_or(true, |(_, best_f)| f.abs() < best_f.abs()) {
        *best = Some((rate, f));
    }
}

/// Solves for the money-weighted return with Newton-Raphson, falling back
/// to bisection on `[-0.9999, 10]` when Newton stalls or leaves the bracket.
///
/// Convergence is `|f(r)| / max(1, Σ|flow|) < 1e-10`. Each phase runs at most
/// 100 iterations; a failed solve returns the best estimate unconverged.
pub fn solve_irr(flows: &[CashFlow], end: NaiveDate, deadline: &Deadline) -> Result<IrrSolution> {
    let Some(npv) = NpvFunction::new(flows, end) else {
        return Ok(IrrSolution {
            rate: IRR_INITIAL_GUESS,
            converged: false,
            iterations: 0,
        });
    };
    let scale = npv.scale();
    let is_root = |f: Decimal| (f / scale).abs() < IRR_TOLERANCE;

    let mut iterations = 0;
    let mut best: Option<(Decimal, Decimal)> = None;

    let mut rate = IRR_INITIAL_GUESS;
    for _ in 0..IRR_MAX_ITERATIONS {
        deadline.check("money-weighted return")?;
        iterations += 1;
        let (Some(f), Some(df)) = (npv.value(rate), npv.derivative(rate)) else {
            break;
        };
        track(rate, f, &mut best);
        if is_root(f) {
            debug!("IRR converged by Newton at {} after {} iteration(s)", rate, iterations);
            return Ok(IrrSolution {
                rate,
                converged: true,
                iterations,
            });
        }
        if df.abs() < IRR_MIN_DERIVATIVE {
            break;
        }
        let Some(next) = f.checked_div(df).map(|step| rate - step) else {
            break;
        };
        if next <= IRR_LOWER_BOUND || next >= IRR_UPPER_BOUND {
            break;
        }
        rate = next;
    }

    debug!("IRR falling back to bisection after {} Newton iteration(s)", iterations);
    let mut low = IRR_LOWER_BOUND;
    let mut high = IRR_UPPER_BOUND;
    if let (Some(mut f_low), Some(f_high)) = (npv.value(low), npv.value(high)) {
        if f_low.is_sign_negative() != f_high.is_sign_negative() {
            for _ in 0..IRR_MAX_ITERATIONS {
                deadline.check("money-weighted return")?;
                iterations += 1;
                let mid = (low + high) / Decimal::TWO;
                let Some(f_mid) = npv.value(mid) else {
                    break;
                };
                track(mid, f_mid, &mut best);
                if is_root(f_mid) {
                    return Ok(IrrSolution {
                        rate: mid,
                        converged: true,
                        iterations,
                    });
                }
                if f_mid.is_sign_negative() == f_low.is_sign_negative() {
                    low = mid;
                    f_low = f_mid;
                } else {
                    high = mid;
                }
            }
        }
    }

    let rate = best.map(|(rate, _)| rate).unwrap_or(IRR_INITIAL_GUESS);
    warn!(
        "IRR did not converge after {} iteration(s); best estimate {}",
        iterations, rate
    );
    Ok(IrrSolution {
        rate,
        converged: false,
        iterations,
    })
}
