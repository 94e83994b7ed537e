//! Core error types for the Foliotrack engine.
//!
//! This module defines database-agnostic error types. Storage-specific errors
//! are converted to these types by the storage layer. Every error carries a
//! stable machine code and an error kind that transports map onto status codes.

use chrono::{NaiveDate, ParseError as ChronoParseError};
use log::error;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::corporate_actions::CorporateActionError;
use crate::market_data::MarketDataError;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the portfolio engine.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Database operation failed: {0}")]
    Database(#[from] DatabaseError),

    #[error("Input validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Ledger operation failed: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Corporate action error: {0}")]
    CorporateAction(#[from] CorporateActionError),

    #[error("Performance calculation failed: {0}")]
    Performance(#[from] PerformanceError),

    #[error("Market data operation failed: {0}")]
    MarketData(#[from] MarketDataError),

    #[error("{0}")]
    NotFound(#[from] NotFoundError),

    #[error("Principal {principal_id} is not allowed to access portfolio {portfolio_id}")]
    Forbidden {
        principal_id: String,
        portfolio_id: String,
    },

    #[error("Cost basis method of portfolio {0} cannot change after its first sale")]
    MethodLocked(String),

    #[error("Deadline exceeded during {0}")]
    DeadlineExceeded(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

/// Database-agnostic error type for storage operations.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// A query against the store failed.
    #[error("Database query failed: {0}")]
    QueryFailed(String),

    /// A unique constraint was violated (e.g., duplicate key).
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    /// A referenced row does not exist.
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// A commit could not be applied; nothing was written.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Internal/unexpected storage error (poisoned locks, IO).
    #[error("Internal database error: {0}")]
    Internal(String),
}

/// Validation errors for user input and data parsing.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Required field '{0}' is missing")]
    MissingField(String),

    #[error("Failed to parse decimal number: {0}")]
    DecimalParse(#[from] rust_decimal::Error),

    #[error("Failed to parse date: {0}")]
    DateTimeParse(#[from] ChronoParseError),

    #[error("Unknown cost basis method '{0}'")]
    InvalidMethod(String),

    #[error("Harvest threshold {0} must be a percentage between -100 and 0")]
    InvalidThreshold(Decimal),

    #[error("Start date {start} is after end date {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("Transaction duplicates existing transaction {0}")]
    DuplicateTransaction(String),
}

/// Business-rule failures raised while maintaining tax lots.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("Insufficient shares of {symbol} on {date}: requested {requested}, available {available}")]
    InsufficientShares {
        symbol: String,
        date: NaiveDate,
        requested: Decimal,
        available: Decimal,
    },

    #[error("Tax lot {lot_id} is not open")]
    LotNotFound { lot_id: String },

    #[error("Lot selections total {selected} but the sale is for {requested}")]
    LotSelectionMismatch { selected: Decimal, requested: Decimal },

    #[error("Sales under SPECIFIC_LOT require lot selections")]
    LotSelectionRequired,

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("Arithmetic overflow: {0}")]
    Overflow(String),
}

/// Failures raised by the performance engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PerformanceError {
    #[error("IRR did not converge after {iterations} iterations (best estimate {best_estimate})")]
    IrrNonConvergent {
        best_estimate: Decimal,
        iterations: u32,
    },

    #[error("Not enough data: {0}")]
    InsufficientData(String),

    #[error("Calculation failed: {0}")]
    Calculation(String),
}

/// Resource-specific lookup failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NotFoundError {
    #[error("Portfolio {0} not found")]
    Portfolio(String),

    #[error("Transaction {0} not found")]
    Transaction(String),

    #[error("No holding of {symbol} in portfolio {portfolio_id}")]
    Holding {
        portfolio_id: String,
        symbol: String,
    },

    #[error("Snapshot for portfolio {portfolio_id} on {date} not found")]
    Snapshot {
        portfolio_id: String,
        date: NaiveDate,
    },

    #[error("Portfolio action {0} not found")]
    Action(String),

    #[error("Corporate action {0} not found")]
    CorporateAction(String),

    #[error("Import batch {0} not found")]
    Batch(String),
}

/// Coarse classification used by transports to pick a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    Validation,
    Forbidden,
    NotFound,
    Conflict,
    BusinessRule,
    Internal,
}

impl ErrorKind {
    /// HTTP-equivalent status code for this kind.
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::Validation | ErrorKind::BusinessRule => 400,
            ErrorKind::Forbidden => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::Internal => 500,
        }
    }
}

/// Wire shape of an error: `{"error": <human>, "code": <MACHINE_CODE>}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Database(_) | Error::Unexpected(_) => ErrorKind::Internal,
            Error::Validation(_) => ErrorKind::Validation,
            Error::Ledger(LedgerError::Overflow(_)) => ErrorKind::Internal,
            Error::Ledger(_) => ErrorKind::BusinessRule,
            Error::CorporateAction(e) => e.kind(),
            Error::Performance(PerformanceError::Calculation(_)) => ErrorKind::Internal,
            Error::Performance(_) => ErrorKind::BusinessRule,
            Error::MarketData(e) => e.kind(),
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Forbidden { .. } => ErrorKind::Forbidden,
            Error::MethodLocked(_) => ErrorKind::Conflict,
            Error::DeadlineExceeded(_) => ErrorKind::Internal,
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Database(_) | Error::Unexpected(_) => "INTERNAL_ERROR",
            Error::Validation(e) => match e {
                ValidationError::InvalidMethod(_) => "INVALID_METHOD",
                ValidationError::InvalidThreshold(_) => "INVALID_THRESHOLD",
                ValidationError::InvalidDateRange { .. } => "INVALID_DATE_RANGE",
                ValidationError::DuplicateTransaction(_) => "DUPLICATE_TRANSACTION",
                _ => "VALIDATION_ERROR",
            },
            Error::Ledger(e) => match e {
                LedgerError::InsufficientShares { .. } => "INSUFFICIENT_SHARES",
                LedgerError::LotNotFound { .. } => "LOT_NOT_FOUND",
                LedgerError::LotSelectionMismatch { .. } => "LOT_SELECTION_MISMATCH",
                LedgerError::LotSelectionRequired => "LOT_SELECTION_REQUIRED",
                LedgerError::InvalidQuantity(_) => "VALIDATION_ERROR",
                LedgerError::Overflow(_) => "INTERNAL_ERROR",
            },
            Error::CorporateAction(e) => e.code(),
            Error::Performance(e) => match e {
                PerformanceError::IrrNonConvergent { .. } => "IRR_NONCONVERGENT",
                PerformanceError::InsufficientData(_) => "INSUFFICIENT_DATA",
                PerformanceError::Calculation(_) => "INTERNAL_ERROR",
            },
            Error::MarketData(e) => e.code(),
            Error::NotFound(e) => match e {
                NotFoundError::Portfolio(_) => "PORTFOLIO_NOT_FOUND",
                NotFoundError::Transaction(_) => "TRANSACTION_NOT_FOUND",
                NotFoundError::Holding { .. } => "HOLDING_NOT_FOUND",
                NotFoundError::Snapshot { .. } => "SNAPSHOT_NOT_FOUND",
                NotFoundError::Action(_) => "ACTION_NOT_FOUND",
                NotFoundError::CorporateAction(_) => "CORPORATE_ACTION_NOT_FOUND",
                NotFoundError::Batch(_) => "BATCH_NOT_FOUND",
            },
            Error::Forbidden { .. } => "FORBIDDEN",
            Error::MethodLocked(_) => "METHOD_LOCKED",
            Error::DeadlineExceeded(_) => "DEADLINE_EXCEEDED",
        }
    }

    pub fn status_code(&self) -> u16 {
        self.kind().status_code()
    }

    /// Renders the transport body. Internal failures are logged and masked.
    pub fn to_response(&self) -> ErrorResponse {
        let message = if self.kind() == ErrorKind::Internal {
            error!("Internal error [{}]: {}", self.code(), self);
            match self {
                Error::DeadlineExceeded(_) => "The request deadline was exceeded".to_string(),
                _ => "Internal server error".to_string(),
            }
        } else {
            self.to_string()
        };
        ErrorResponse {
            error: message,
            code: self.code().to_string(),
        }
    }

    /// Shorthand for free-form validation failures.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Error::Validation(ValidationError::InvalidInput(message.into()))
    }
}

// === From implementations for common error types ===

impl From<rust_decimal::Error> for Error {
    fn from(err: rust_decimal::Error) -> Self {
        Error::Validation(ValidationError::DecimalParse(err))
    }
}

impl From<ChronoParseError> for Error {
    fn from(err: ChronoParseError) -> Self {
        Error::Validation(ValidationError::DateTimeParse(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Validation(ValidationError::InvalidInput(err.to_string()))
    }
}

impl From<Error> for String {
    fn from(err: Error) -> Self {
        err.to_string()
    }
}
