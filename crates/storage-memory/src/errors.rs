//! Storage-specific error types for the in-process store.
//!
//! These errors stay inside the storage layer and are converted to
//! `foliotrack_core::Error` before being returned to callers.

use std::path::PathBuf;
use thiserror::Error;
use foliotrack_core::errors::{DatabaseError, Error};

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("State lock poisoned: {0}")]
    Poisoned(String),

    #[error("Duplicate key: {0}")]
    UniqueViolation(String),

    #[error("Missing row: {0}")]
    MissingRow(String),

    #[error("Unknown parent row: {0}")]
    ForeignKeyViolation(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Poisoned(e) => Error::Database(DatabaseError::Internal(e)),
            StorageError::UniqueViolation(e) => Error::Database(DatabaseError::UniqueViolation(e)),
            StorageError::MissingRow(e) => Error::Database(DatabaseError::TransactionFailed(e)),
            StorageError::ForeignKeyViolation(e) => {
                Error::Database(DatabaseError::ForeignKeyViolation(e))
            }
            e @ StorageError::Io { .. } => Error::Database(DatabaseError::Internal(e.to_string())),
            StorageError::Serialization(e) => {
                Error::Database(DatabaseError::Internal(e.to_string()))
            }
        }
    }
}

/// Extension trait for converting storage Results to core Results.
pub trait IntoCore<T> {
    fn into_core(self) -> foliotrack_core::Result<T>;
}

impl<T> IntoCore<T> for std::result::Result<T, StorageError> {
    fn into_core(self) -> foliotrack_core::Result<T> {
        self.map_err(Error::from)
    }
}
