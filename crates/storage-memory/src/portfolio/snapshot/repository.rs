use chrono::NaiveDate;
use log::debug;
use std::collections::HashSet;
use std::sync::Arc;

use crate::db::MemoryDb;
use crate::errors::StorageError;
use foliotrack_core::errors::Result;
use foliotrack_core::portfolio::snapshot::{PerformanceSnapshot, SnapshotRepositoryTrait};

pub struct SnapshotRepository {
    db: Arc<MemoryDb>,
}

impl SnapshotRepository {
    pub fn new(db: Arc<MemoryDb>) -> Self {
        Self { db }
    }
}

impl SnapshotRepositoryTrait for SnapshotRepository {
    fn get(&self, portfolio_id: &str, date: NaiveDate) -> Result<Option<PerformanceSnapshot>> {
        self.db.read(|state| {
            state
                .portfolio(portfolio_id)
                .and_then(|p| p.snapshots.get(&date))
                .cloned()
        })
    }

    fn list(
        &self,
        portfolio_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<PerformanceSnapshot>> {
        self.db.read(|state| {
            state
                .portfolio(portfolio_id)
                .map(|p| {
                    p.snapshots
                        .values()
                        .rev()
                        .skip(offset)
                        .take(limit)
                        .cloned()
                        .collect()
                })
                .unwrap_or_default()
        })
    }

    fn count(&self, portfolio_id: &str) -> Result<usize> {
        self.db
            .read(|state| state.portfolio(portfolio_id).map_or(0, |p| p.snapshots.len()))
    }

    fn insert_many(&self, snapshots: Vec<PerformanceSnapshot>) -> Result<usize> {
        if snapshots.is_empty() {
            return Ok(0);
        }
        let count = snapshots.len();
        self.db.write(|state| {
            let mut seen = HashSet::new();
            for snapshot in snapshots {
                let Some(partition) = state.portfolio_mut(&snapshot.portfolio_id) else {
                    return Err(StorageError::ForeignKeyViolation(format!(
                        "snapshots.portfolio_id {}",
                        snapshot.portfolio_id
                    )));
                };
                let by_date = &mut partition.snapshots;
                if by_date.contains_key(&snapshot.date)
                    || !seen.insert((snapshot.portfolio_id.clone(), snapshot.date))
                {
                    return Err(StorageError::UniqueViolation(format!(
                        "snapshots ({}, {})",
                        snapshot.portfolio_id, snapshot.date
                    )));
                }
                by_date.insert(snapshot.date, snapshot);
            }
            Ok(())
        })?;
        debug!("Inserted {} snapshot(s)", count);
        Ok(count)
    }
}
