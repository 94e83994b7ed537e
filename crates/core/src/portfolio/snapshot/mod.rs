//! Daily performance snapshots.

mod snapshot_model;
mod snapshot_service;
mod snapshot_traits;


pub use snapshot_model::{DailySnapshotReport, PerformanceSnapshot, SnapshotFailure, SnapshotPage};
pub use snapshot_service::{SnapshotService, SnapshotServiceTrait};
pub use snapshot_traits::SnapshotRepositoryTrait;
