use std::sync::Arc;

use crate::db::MemoryDb;
use crate::errors::StorageError;
use foliotrack_core::corporate_actions::{
    ActionStatus, CorporateAction, CorporateActionRepositoryTrait, PortfolioAction,
};
use foliotrack_core::errors::Result;

pub struct CorporateActionRepository {
    db: Arc<MemoryDb>,
}

impl CorporateActionRepository {
    pub fn new(db: Arc<MemoryDb>) -> Self {
        Self { db }
    }
}

impl CorporateActionRepositoryTrait for CorporateActionRepository {
    fn create(&self, corporate_action: CorporateAction) -> Result<CorporateAction> {
        self.db.write(|state| {
            if state.corporate_actions.contains_key(&corporate_action.id) {
                return Err(StorageError::UniqueViolation(format!(
                    "corporate_actions.id {}",
                    corporate_action.id
                )));
            }
            Arc::make_mut(&mut state.corporate_actions)
                .insert(corporate_action.id.clone(), corporate_action.clone());
            Ok(corporate_action)
        })
    }

    fn get_by_id(&self, corporate_action_id: &str) -> Result<Option<CorporateAction>> {
        self.db
            .read(|state| state.corporate_actions.get(corporate_action_id).cloned())
    }

    fn list(&self, symbol: Option<&str>) -> Result<Vec<CorporateAction>> {
        let mut actions = self.db.read(|state| {
            state
                .corporate_actions
                .values()
                .filter(|ca| symbol.map_or(true, |s| ca.symbol == s))
                .cloned()
                .collect::<Vec<_>>()
        })?;
        actions.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));
        Ok(actions)
    }

    fn get_portfolio_action(&self, action_id: &str) -> Result<Option<PortfolioAction>> {
        self.db
            .read(|state| state.portfolio_action(action_id).cloned())
    }

    fn list_portfolio_actions(
        &self,
        portfolio_id: &str,
        status: Option<ActionStatus>,
    ) -> Result<Vec<PortfolioAction>> {
        let mut actions = self.db.read(|state| {
            state
                .portfolio(portfolio_id)
                .map(|p| {
                    p.actions
                        .values()
                        .filter(|a| status.map_or(true, |s| a.status == s))
                        .cloned()
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default()
        })?;
        actions.sort_by(|a, b| {
            a.detected_at
                .cmp(&b.detected_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(actions)
    }
}
