//! Imports module - batched ingestion of normalized transaction records.

mod imports_model;
mod imports_service;
mod imports_traits;

pub use imports_model::{CommitPolicy, ImportBatch, ImportRequest, ImportResult, ImportRowResult};
pub use imports_service::ImportService;
pub use imports_traits::{ImportBatchRepositoryTrait, ImportServiceTrait};
