use chrono::NaiveDate;
use thiserror::Error;

use crate::errors::ErrorKind;

/// Failures surfaced by a price oracle.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarketDataError {
    #[error("No price for {symbol} on or before {date}")]
    PriceNotFound { symbol: String, date: NaiveDate },

    #[error("No quote available for {0}")]
    QuoteNotFound(String),

    #[error("No exchange rate {from}->{to} on or before {date}")]
    FxRateNotFound {
        from: String,
        to: String,
        date: NaiveDate,
    },

    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Price oracle timed out: {0}")]
    Timeout(String),
}

impl MarketDataError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MarketDataError::PriceNotFound { .. }
            | MarketDataError::QuoteNotFound(_)
            | MarketDataError::FxRateNotFound { .. } => ErrorKind::BusinessRule,
            MarketDataError::ProviderError(_) | MarketDataError::Timeout(_) => {
                ErrorKind::Internal
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            MarketDataError::PriceNotFound { .. } | MarketDataError::QuoteNotFound(_) => {
                "PRICE_NOT_AVAILABLE"
            }
            MarketDataError::FxRateNotFound { .. } => "FX_RATE_NOT_AVAILABLE",
            MarketDataError::ProviderError(_) | MarketDataError::Timeout(_) => "INTERNAL_ERROR",
        }
    }
}
