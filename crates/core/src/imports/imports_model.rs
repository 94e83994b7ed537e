//! Import batch and result models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ErrorResponse;
use crate::transactions::NewTransaction;

/// A committed import. Deleting it deletes exactly the transactions tagged
/// with its id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportBatch {
    pub id: String,
    pub portfolio_id: String,
    /// Free-form origin label, e.g. `"csv:broker-2024.csv"` or `"bulk"`.
    pub source: String,
    pub created_at: DateTime<Utc>,
    pub success_count: usize,
    pub failure_count: usize,
}

/// What to do when some rows fail.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommitPolicy {
    /// Commit only if every row is valid.
    #[default]
    AllOrNothing,
    /// Commit the valid rows and report the rest.
    ValidRowsOnly,
}

/// Normalized records to import into one portfolio.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<String>,
    pub source: String,
    pub records: Vec<NewTransaction>,
    #[serde(default)]
    pub policy: CommitPolicy,
}

/// Outcome of one input row. Rows are numbered from 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRowResult {
    pub row: usize,
    /// Id the row was (or would be) stored under.
    pub transaction_id: Option<String>,
    pub error: Option<ErrorResponse>,
}

impl ImportRowResult {
    pub fn is_valid(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub batch_id: String,
    /// Whether any rows were written.
    pub committed: bool,
    pub success_count: usize,
    pub failure_count: usize,
    pub rows: Vec<ImportRowResult>,
}

impl ImportResult {
    pub fn errors(&self) -> impl Iterator<Item = &ImportRowResult> {
        self.rows.iter().filter(|row| !row.is_valid())
    }
}
