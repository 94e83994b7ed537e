//! Domain event types.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Domain events emitted by core services after successful commits.
///
/// These events represent facts about portfolio data changes. Runtime adapters
/// translate them into side work (cache invalidation, notifications, dumps).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    /// Transactions were created, updated, or deleted.
    TransactionsChanged {
        portfolio_id: String,
        transaction_ids: Vec<String>,
        symbols: Vec<String>,
    },

    /// Lots, holdings and realized gains were re-derived from the event log.
    LedgerRederived {
        portfolio_id: String,
        /// Earliest event date whose downstream state changed.
        from_date: Option<NaiveDate>,
    },

    /// A corporate action was applied to a portfolio.
    CorporateActionApplied {
        portfolio_id: String,
        action_id: String,
        corporate_action_id: String,
    },

    /// An import batch was committed.
    ImportCommitted {
        portfolio_id: String,
        batch_id: String,
        success_count: usize,
        failure_count: usize,
    },

    /// Performance snapshots were persisted for a day.
    SnapshotsTaken {
        portfolio_ids: Vec<String>,
        date: NaiveDate,
    },

    /// A portfolio and all its owned rows were removed.
    PortfolioDeleted { portfolio_id: String },
}

impl DomainEvent {
    pub fn transactions_changed(
        portfolio_id: String,
        transaction_ids: Vec<String>,
        symbols: Vec<String>,
    ) -> Self {
        Self::TransactionsChanged {
            portfolio_id,
            transaction_ids,
            symbols,
        }
    }

    pub fn ledger_rederived(portfolio_id: String, from_date: Option<NaiveDate>) -> Self {
        Self::LedgerRederived {
            portfolio_id,
            from_date,
        }
    }

    pub fn corporate_action_applied(
        portfolio_id: String,
        action_id: String,
        corporate_action_id: String,
    ) -> Self {
        Self::CorporateActionApplied {
            portfolio_id,
            action_id,
            corporate_action_id,
        }
    }

    pub fn import_committed(
        portfolio_id: String,
        batch_id: String,
        success_count: usize,
        failure_count: usize,
    ) -> Self {
        Self::ImportCommitted {
            portfolio_id,
            batch_id,
            success_count,
            failure_count,
        }
    }

    pub fn snapshots_taken(portfolio_ids: Vec<String>, date: NaiveDate) -> Self {
        Self::SnapshotsTaken {
            portfolio_ids,
            date,
        }
    }

    pub fn portfolio_deleted(portfolio_id: String) -> Self {
        Self::PortfolioDeleted { portfolio_id }
    }

    /// Portfolio this event concerns, when it concerns exactly one.
    pub fn portfolio_id(&self) -> Option<&str> {
        match self {
            Self::TransactionsChanged { portfolio_id, .. }
            | Self::LedgerRederived { portfolio_id, .. }
            | Self::CorporateActionApplied { portfolio_id, .. }
            | Self::ImportCommitted { portfolio_id, .. }
            | Self::PortfolioDeleted { portfolio_id } => Some(portfolio_id),
            Self::SnapshotsTaken { .. } => None,
        }
    }
}
