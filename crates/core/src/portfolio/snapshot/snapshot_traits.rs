//! Repository trait for performance snapshots.

use chrono::NaiveDate;

use super::snapshot_model::PerformanceSnapshot;
use crate::errors::Result;

pub trait SnapshotRepositoryTrait: Send + Sync {
    fn get(&self, portfolio_id: &str, date: NaiveDate) -> Result<Option<PerformanceSnapshot>>;

    /// Snapshots ordered by date descending.
    fn list(
        &self,
        portfolio_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<PerformanceSnapshot>>;

    fn count(&self, portfolio_id: &str) -> Result<usize>;

    /// Inserts all snapshots or none. A (portfolio, date) that already has a
    /// snapshot fails the whole insert with a unique violation.
    fn insert_many(&self, snapshots: Vec<PerformanceSnapshot>) -> Result<usize>;
}
