use chrono::NaiveDate;
use std::cmp::Ordering;

use crate::corporate_actions::{ActionApplication, PortfolioAction};
use crate::imports::ImportBatch;
use crate::portfolio::lots::DerivedState;
use crate::transactions::Transaction;

/// One entry of a portfolio's replayable log.
#[derive(Debug, Clone, Copy)]
pub enum LedgerEvent<'a> {
    Transaction(&'a Transaction),
    CorporateAction(&'a ActionApplication),
}

impl LedgerEvent<'_> {
    pub fn date(&self) -> NaiveDate {
        match self {
            LedgerEvent::Transaction(tx) => tx.date,
            LedgerEvent::CorporateAction(app) => app.corporate_action.date,
        }
    }

    /// Date first; on the same date transactions precede corporate actions,
    /// so shares bought on an action's date are affected by it.
    pub fn log_cmp(&self, other: &LedgerEvent<'_>) -> Ordering {
        self.date().cmp(&other.date()).then_with(|| match (self, other) {
            (LedgerEvent::Transaction(a), LedgerEvent::Transaction(b)) => a.event_cmp(b),
            (LedgerEvent::CorporateAction(a), LedgerEvent::CorporateAction(b)) => {
                a.application_cmp(b)
            }
            (LedgerEvent::Transaction(_), LedgerEvent::CorporateAction(_)) => Ordering::Less,
            (LedgerEvent::CorporateAction(_), LedgerEvent::Transaction(_)) => Ordering::Greater,
        })
    }
}

/// Merges transactions and applied actions into replay order.
pub fn merge_event_log<'a>(
    transactions: &'a [Transaction],
    applications: &'a [ActionApplication],
) -> Vec<LedgerEvent<'a>> {
    let mut events: Vec<LedgerEvent<'a>> = transactions
        .iter()
        .map(LedgerEvent::Transaction)
        .chain(applications.iter().map(LedgerEvent::CorporateAction))
        .collect();
    events.sort_by(|a, b| a.log_cmp(b));
    events
}

/// A portfolio's full replay input.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    pub transactions: Vec<Transaction>,
    /// APPLIED portfolio actions joined with their corporate actions.
    pub applications: Vec<ActionApplication>,
}

impl EventLog {
    pub fn events(&self) -> Vec<LedgerEvent<'_>> {
        merge_event_log(&self.transactions, &self.applications)
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty() && self.applications.is_empty()
    }
}

/// All changes of one portfolio write, committed together.
#[derive(Debug, Clone, Default)]
pub struct PortfolioWrite {
    pub portfolio_id: String,
    pub insert_transactions: Vec<Transaction>,
    pub update_transactions: Vec<Transaction>,
    pub delete_transaction_ids: Vec<String>,
    /// Replaces lots and live-sale gains when present.
    pub derived: Option<DerivedState>,
    pub upsert_actions: Vec<PortfolioAction>,
    pub upsert_batch: Option<ImportBatch>,
    pub delete_batch_id: Option<String>,
}

impl PortfolioWrite {
    pub fn new(portfolio_id: &str) -> Self {
        Self {
            portfolio_id: portfolio_id.to_string(),
            ..Self::default()
        }
    }

    pub fn insert_transaction(mut self, transaction: Transaction) -> Self {
        self.insert_transactions.push(transaction);
        self
    }

    pub fn update_transaction(mut self, transaction: Transaction) -> Self {
        self.update_transactions.push(transaction);
        self
    }

    pub fn delete_transaction(mut self, transaction_id: &str) -> Self {
        self.delete_transaction_ids.push(transaction_id.to_string());
        self
    }

    pub fn with_derived(mut self, derived: DerivedState) -> Self {
        self.derived = Some(derived);
        self
    }

    pub fn upsert_action(mut self, action: PortfolioAction) -> Self {
        self.upsert_actions.push(action);
        self
    }

    pub fn upsert_batch(mut self, batch: ImportBatch) -> Self {
        self.upsert_batch = Some(batch);
        self
    }

    pub fn delete_batch(mut self, batch_id: &str) -> Self {
        self.delete_batch_id = Some(batch_id.to_string());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.insert_transactions.is_empty()
            && self.update_transactions.is_empty()
            && self.delete_transaction_ids.is_empty()
            && self.derived.is_none()
            && self.upsert_actions.is_empty()
            && self.upsert_batch.is_none()
            && self.delete_batch_id.is_none()
    }
}
