//! Matches global corporate actions against a portfolio's open lots.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashSet};

use super::corporate_actions_model::{ActionStatus, CorporateAction, PortfolioAction};
use crate::portfolio::lots::TaxLot;

/// Open quantity and earliest purchase date per symbol.
fn open_positions(lots: &[TaxLot]) -> BTreeMap<&str, (Decimal, NaiveDate)> {
    let mut positions: BTreeMap<&str, (Decimal, NaiveDate)> = BTreeMap::new();
    for lot in lots.iter().filter(|lot| lot.is_open()) {
        positions
            .entry(lot.symbol.as_str())
            .and_modify(|(quantity, earliest)| {
                *quantity += lot.quantity;
                if lot.purchase_date < *earliest {
                    *earliest = lot.purchase_date;
                }
            })
            .or_insert((lot.quantity, lot.purchase_date));
    }
    positions
}

/// Builds PENDING rows for every action on a held symbol dated on or after
/// the earliest open lot, skipping actions the portfolio already has a row for.
pub fn detect_pending_actions(
    portfolio_id: &str,
    lots: &[TaxLot],
    corporate_actions: &[CorporateAction],
    existing: &[PortfolioAction],
    detected_at: DateTime<Utc>,
    mut new_id: impl FnMut() -> String,
) -> Vec<PortfolioAction> {
    let positions = open_positions(lots);
    let known: HashSet<&str> = existing
        .iter()
        .map(|action| action.corporate_action_id.as_str())
        .collect();

    let mut candidates: Vec<&CorporateAction> = corporate_actions
        .iter()
        .filter(|ca| !known.contains(ca.id.as_str()))
        .filter(|ca| match positions.get(ca.symbol.as_str()) {
            Some((_, earliest)) => ca.date >= *earliest,
            None => false,
        })
        .collect();
    candidates.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));

    candidates
        .into_iter()
        .map(|ca| {
            let shares_affected = positions
                .get(ca.symbol.as_str())
                .map(|(quantity, _)| *quantity)
                .unwrap_or(Decimal::ZERO);
            PortfolioAction {
                id: new_id(),
                portfolio_id: portfolio_id.to_string(),
                corporate_action_id: ca.id.clone(),
                status: ActionStatus::Pending,
                affected_symbol: ca.symbol.clone(),
                shares_affected,
                detected_at,
                reviewed_at: None,
                applied_at: None,
                reviewer_id: None,
                notes: None,
            }
        })
        .collect()
}
