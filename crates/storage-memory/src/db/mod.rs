//! The in-process store: one state value behind a lock, with all-or-nothing
//! writes and a JSON dump for persistence across restarts.
//!
//! Each portfolio's rows live in their own `Arc`'d partition. A write works
//! on a shallow copy of the state and clones only the partitions it touches.

use chrono::NaiveDate;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, RwLock};

use crate::errors::{IntoCore, StorageError};
use foliotrack_core::corporate_actions::{CorporateAction, PortfolioAction};
use foliotrack_core::errors::Result;
use foliotrack_core::imports::ImportBatch;
use foliotrack_core::portfolio::holdings::Holding;
use foliotrack_core::portfolio::lots::{RealizedGain, TaxLot};
use foliotrack_core::portfolio::snapshot::PerformanceSnapshot;
use foliotrack_core::portfolios::Portfolio;
use foliotrack_core::transactions::Transaction;

/// Every row owned by one portfolio. Maps are keyed by row id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioState {
    pub portfolio: Portfolio,
    #[serde(default)]
    pub transactions: BTreeMap<String, Transaction>,
    #[serde(default)]
    pub actions: BTreeMap<String, PortfolioAction>,
    #[serde(default)]
    pub lots: Vec<TaxLot>,
    #[serde(default)]
    pub realized_gains: Vec<RealizedGain>,
    /// `None` until holdings are first saved.
    #[serde(default)]
    pub holdings: Option<Vec<Holding>>,
    /// Stored holdings lag behind the lots.
    #[serde(default)]
    pub holdings_stale: bool,
    #[serde(default)]
    pub snapshots: BTreeMap<NaiveDate, PerformanceSnapshot>,
    #[serde(default)]
    pub import_batches: BTreeMap<String, ImportBatch>,
}

impl PortfolioState {
    pub fn new(portfolio: Portfolio) -> Self {
        Self {
            portfolio,
            transactions: BTreeMap::new(),
            actions: BTreeMap::new(),
            lots: Vec::new(),
            realized_gains: Vec::new(),
            holdings: None,
            holdings_stale: false,
            snapshots: BTreeMap::new(),
            import_batches: BTreeMap::new(),
        }
    }
}

/// Every table of the store: per-portfolio partitions keyed by portfolio
/// id, plus the shared corporate-action registry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreState {
    pub portfolios: BTreeMap<String, Arc<PortfolioState>>,
    pub corporate_actions: Arc<BTreeMap<String, CorporateAction>>,
}

impl StoreState {
    pub fn portfolio(&self, portfolio_id: &str) -> Option<&PortfolioState> {
        self.portfolios.get(portfolio_id).map(Arc::as_ref)
    }

    /// Mutable access to one partition, cloning it first when a reader
    /// still shares it.
    pub fn portfolio_mut(&mut self, portfolio_id: &str) -> Option<&mut PortfolioState> {
        self.portfolios.get_mut(portfolio_id).map(Arc::make_mut)
    }

    /// Like [`StoreState::portfolio_mut`], failing for unknown portfolios.
    pub fn require_portfolio_mut(
        &mut self,
        portfolio_id: &str,
    ) -> std::result::Result<&mut PortfolioState, StorageError> {
        self.portfolio_mut(portfolio_id)
            .ok_or_else(|| StorageError::ForeignKeyViolation(format!("portfolios.id {}", portfolio_id)))
    }

    pub fn partitions(&self) -> impl Iterator<Item = &PortfolioState> {
        self.portfolios.values().map(Arc::as_ref)
    }

    /// Transaction ids are unique across portfolios.
    pub fn transaction(&self, transaction_id: &str) -> Option<&Transaction> {
        self.partitions()
            .find_map(|p| p.transactions.get(transaction_id))
    }

    pub fn portfolio_action(&self, action_id: &str) -> Option<&PortfolioAction> {
        self.partitions().find_map(|p| p.actions.get(action_id))
    }

    pub fn import_batch(&self, batch_id: &str) -> Option<&ImportBatch> {
        self.partitions().find_map(|p| p.import_batches.get(batch_id))
    }

    pub fn transaction_count(&self) -> usize {
        self.partitions().map(|p| p.transactions.len()).sum()
    }

    /// Removes a portfolio and every row it owns. Returns whether it existed.
    pub fn remove_portfolio(&mut self, portfolio_id: &str) -> bool {
        self.portfolios.remove(portfolio_id).is_some()
    }
}

/// Shared handle to the store. Repositories hold an `Arc<MemoryDb>`.
#[derive(Debug, Default)]
pub struct MemoryDb {
    state: RwLock<StoreState>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_state(state: StoreState) -> Self {
        Self {
            state: RwLock::new(state),
        }
    }

    /// Runs `f` against the current state under the shared lock.
    pub fn read<T>(&self, f: impl FnOnce(&StoreState) -> T) -> Result<T> {
        let state = self
            .state
            .read()
            .map_err(|e| StorageError::Poisoned(e.to_string()))
            .into_core()?;
        Ok(f(&state))
    }

    /// Runs `f` against a working copy and installs it only when `f`
    /// succeeds, so a failed write leaves the store untouched. The copy
    /// shares every partition until `f` mutates it.
    pub fn write<T>(
        &self,
        f: impl FnOnce(&mut StoreState) -> std::result::Result<T, StorageError>,
    ) -> Result<T> {
        let mut state = self
            .state
            .write()
            .map_err(|e| StorageError::Poisoned(e.to_string()))
            .into_core()?;
        let mut working = state.clone();
        let out = f(&mut working).into_core()?;
        *state = working;
        Ok(out)
    }

    /// A copy of the whole state.
    pub fn export_state(&self) -> Result<StoreState> {
        self.read(StoreState::clone)
    }

    /// Writes the state as JSON next to `path` and renames it into place.
    pub fn dump(&self, path: &Path) -> Result<()> {
        let state = self.export_state()?;
        let json = serde_json::to_vec_pretty(&state)
            .map_err(StorageError::from)
            .into_core()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|source| StorageError::Io {
                    path: parent.to_path_buf(),
                    source,
                })
                .into_core()?;
        }
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)
            .and_then(|_| fs::rename(&tmp, path))
            .map_err(|source| StorageError::Io {
                path: path.to_path_buf(),
                source,
            })
            .into_core()?;
        debug!(
            "Dumped {} portfolio(s) and {} transaction(s) to {}",
            state.portfolios.len(),
            state.transaction_count(),
            path.display()
        );
        Ok(())
    }

    /// Loads a dump written by [`MemoryDb::dump`]. A missing file yields an
    /// empty store.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("No state dump at {}, starting empty", path.display());
            return Ok(Self::new());
        }
        let bytes = fs::read(path)
            .map_err(|source| StorageError::Io {
                path: path.to_path_buf(),
                source,
            })
            .into_core()?;
        let state: StoreState = serde_json::from_slice(&bytes)
            .map_err(StorageError::from)
            .into_core()?;
        info!(
            "Loaded {} portfolio(s) and {} transaction(s) from {}",
            state.portfolios.len(),
            state.transaction_count(),
            path.display()
        );
        Ok(Self::from_state(state))
    }
}
