//! Exact decimal helpers.
//!
//! All monetary and quantity arithmetic in the engine goes through
//! `rust_decimal::Decimal` (96-bit mantissa, 28 significant digits). Internal
//! reductions keep full precision; rounding (banker's) happens only when a
//! value is prepared for display or reporting.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, MathematicalOps, RoundingStrategy};
use std::str::FromStr;

use crate::constants::{DECIMAL_PRECISION, DISPLAY_DECIMAL_PRECISION};
use crate::errors::{Result, ValidationError};

/// Divides and rounds the quotient to `scale` fractional digits.
/// Returns `None` on division by zero or overflow.
pub fn div_with_scale(numerator: Decimal, denominator: Decimal, scale: u32) -> Option<Decimal> {
    numerator
        .checked_div(denominator)
        .map(|q| q.round_dp_with_strategy(scale, RoundingStrategy::MidpointNearestEven))
}

/// `amount × part / whole`, multiplying first so small ratios keep their digits.
pub fn pro_rata(amount: Decimal, part: Decimal, whole: Decimal) -> Option<Decimal> {
    if whole.is_zero() {
        return None;
    }
    match amount.checked_mul(part) {
        Some(product) => product.checked_div(whole),
        // Fall back to dividing first when the product does not fit.
        None => amount.checked_div(whole)?.checked_mul(part),
    }
}

/// Raises `base` to a decimal power.
///
/// Integer exponents use repeated multiplication; fractional exponents go
/// through `exp(ln(base) × exponent)` and therefore require a positive base.
pub fn pow(base: Decimal, exponent: Decimal) -> Option<Decimal> {
    if exponent.is_zero() {
        return Some(Decimal::ONE);
    }
    if base.is_zero() {
        return if exponent.is_sign_positive() {
            Some(Decimal::ZERO)
        } else {
            None
        };
    }
    if exponent.fract().is_zero() {
        if let Some(whole) = exponent.trunc().to_i64() {
            return base.checked_powi(whole);
        }
    }
    if base.is_sign_negative() {
        return None;
    }
    base.checked_powd(exponent)
}

/// `part / whole × 100`, or `None` when `whole` is zero.
pub fn percent_of(part: Decimal, whole: Decimal) -> Option<Decimal> {
    part.checked_div(whole)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
}

/// Banker's rounding to the display scale.
pub fn round_display(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DISPLAY_DECIMAL_PRECISION, RoundingStrategy::MidpointNearestEven)
}

/// Banker's rounding to the reporting scale used by analytics.
pub fn round_metric(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PRECISION, RoundingStrategy::MidpointNearestEven)
}

/// Parses a decimal string, accepting scientific notation.
pub fn parse_decimal(value: &str, field_name: &str) -> Result<Decimal> {
    let trimmed = value.trim();
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|e| {
            ValidationError::InvalidInput(format!(
                "Field '{}' is not a decimal number ('{}'): {}",
                field_name, value, e
            ))
            .into()
        })
}
