//! Shared field validators for user-supplied identifiers.

use lazy_static::lazy_static;
use regex::Regex;

use crate::errors::{Result, ValidationError};

lazy_static! {
    /// ISO-4217 style currency code, e.g. `USD`.
    static ref CURRENCY_REGEX: Regex = Regex::new(r"^[A-Z]{3}$").expect("Invalid regex pattern");

    /// Ticker symbol after normalization, e.g. `BRK.B`, `RDS-A`.
    static ref SYMBOL_REGEX: Regex =
        Regex::new(r"^[A-Z0-9.\-]{1,20}$").expect("Invalid regex pattern");
}

/// Upper-cases and validates a currency code.
pub fn normalize_currency(value: &str) -> Result<String> {
    let code = value.trim().to_uppercase();
    if !CURRENCY_REGEX.is_match(&code) {
        return Err(ValidationError::InvalidInput(format!(
            "Currency '{}' is not a three-letter ISO 4217 code",
            value
        ))
        .into());
    }
    Ok(code)
}

/// Upper-cases and validates a ticker symbol.
pub fn normalize_symbol(value: &str) -> Result<String> {
    let symbol = value.trim().to_uppercase();
    if !SYMBOL_REGEX.is_match(&symbol) {
        return Err(ValidationError::InvalidInput(format!("Invalid symbol '{}'", value)).into());
    }
    Ok(symbol)
}

/// Rejects blank required strings.
pub fn require_non_empty(value: &str, field_name: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField(field_name.to_string()).into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_currency() {
        assert_eq!(normalize_currency(" usd ").unwrap(), "USD");
        assert!(normalize_currency("US").is_err());
        assert!(normalize_currency("US1").is_err());
    }

    #[test]
    fn test_normalize_symbol() {
        assert_eq!(normalize_symbol("brk.b").unwrap(), "BRK.B");
        assert_eq!(normalize_symbol("RDS-A").unwrap(), "RDS-A");
        assert!(normalize_symbol("").is_err());
        assert!(normalize_symbol("A B").is_err());
        assert!(normalize_symbol("ABCDEFGHIJKLMNOPQRSTU").is_err());
    }

    #[test]
    fn test_require_non_empty() {
        assert!(require_non_empty("Core", "name").is_ok());
        let err = require_non_empty("   ", "name").unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }
}
