use rust_decimal_macros::dec;

use super::*;
use crate::test_fixtures::*;

fn new_action(action_type: CorporateActionType) -> NewCorporateAction {
    NewCorporateAction {
        id: None,
        symbol: " aapl ".to_string(),
        action_type,
        date: d(2024, 6, 1),
        ratio: None,
        amount: None,
        new_symbol: None,
        currency: None,
    }
}

#[test]
fn test_split_requires_positive_ratio() {
    let mut input = new_action(CorporateActionType::Split);
    let err = input.validate().unwrap_err();
    assert_eq!(err.code(), "VALIDATION_ERROR");

    input.ratio = Some(dec!(0));
    assert!(input.validate().is_err());

    input.ratio = Some(dec!(2));
    input.validate().unwrap();
    assert_eq!(input.symbol, "AAPL");
}

#[test]
fn test_dividend_requires_positive_amount() {
    let mut input = new_action(CorporateActionType::Dividend);
    input.amount = Some(dec!(-0.1));
    assert!(input.validate().is_err());
    input.amount = Some(dec!(0.24));
    input.currency = Some("usd".to_string());
    input.validate().unwrap();
    assert_eq!(input.currency.as_deref(), Some("USD"));
}

#[test]
fn test_merger_requires_distinct_new_symbol() {
    let mut input = new_action(CorporateActionType::Merger);
    input.ratio = Some(dec!(0.5));
    assert!(input.validate().is_err());

    input.new_symbol = Some("aapl".to_string());
    assert!(input.validate().is_err());

    input.new_symbol = Some("newco".to_string());
    input.validate().unwrap();
    assert_eq!(input.new_symbol.as_deref(), Some("NEWCO"));
}

#[test]
fn test_status_transitions() {
    assert_eq!(ActionStatus::Pending.approve(), Ok(ActionStatus::Approved));
    assert_eq!(ActionStatus::Pending.reject(), Ok(ActionStatus::Rejected));
    assert_eq!(ActionStatus::Approved.apply(), Ok(ActionStatus::Applied));

    assert_eq!(
        ActionStatus::Approved.approve(),
        Err(TransitionError::NotPending(ActionStatus::Approved))
    );
    assert_eq!(
        ActionStatus::Rejected.reject(),
        Err(TransitionError::NotPending(ActionStatus::Rejected))
    );
    assert_eq!(
        ActionStatus::Pending.apply(),
        Err(TransitionError::NotApproved(ActionStatus::Pending))
    );
    assert!(ActionStatus::Applied.is_terminal());
    assert!(!ActionStatus::Approved.is_terminal());
}

#[test]
fn test_approve_then_apply_stamps_review() {
    let ca = corporate_action("ca1", "AAPL", CorporateActionType::Split, d(2024, 6, 1), Some(dec!(2)), None, None);
    let pending = pending_action("pa1", &ca, dec!(10));

    let approved = pending.approve("owner", Some("ok".to_string()), ts(20)).unwrap();
    assert_eq!(approved.status, ActionStatus::Approved);
    assert_eq!(approved.reviewer_id.as_deref(), Some("owner"));
    assert_eq!(approved.reviewed_at, Some(ts(20)));

    let applied = approved.mark_applied(ts(30)).unwrap();
    assert_eq!(applied.status, ActionStatus::Applied);
    assert_eq!(applied.applied_at, Some(ts(30)));
    assert_eq!(applied.reviewed_at, Some(ts(20)));
}

#[test]
fn test_rejecting_twice_is_not_pending() {
    let ca = corporate_action("ca1", "AAPL", CorporateActionType::Split, d(2024, 6, 1), Some(dec!(2)), None, None);
    let rejected = pending_action("pa1", &ca, dec!(10))
        .reject("owner", Some("wrong ratio".to_string()), ts(20))
        .unwrap();
    let err: crate::Error = rejected.reject("owner", None, ts(21)).unwrap_err().into();
    assert_eq!(err.code(), "ACTION_NOT_PENDING");
    assert_eq!(err.status_code(), 400);
}

#[test]
fn test_applying_unapproved_action_conflicts() {
    let ca = corporate_action("ca1", "AAPL", CorporateActionType::Split, d(2024, 6, 1), Some(dec!(2)), None, None);
    let err: crate::Error = pending_action("pa1", &ca, dec!(10))
        .mark_applied(ts(20))
        .unwrap_err()
        .into();
    assert_eq!(err.code(), "ACTION_NOT_APPROVED");
    assert_eq!(err.status_code(), 409);
}

#[test]
fn test_application_order_by_date_then_detection() {
    let early = applied(corporate_action("a", "AAPL", CorporateActionType::Split, d(2024, 1, 1), Some(dec!(2)), None, None));
    let mut late = applied(corporate_action("b", "AAPL", CorporateActionType::Split, d(2024, 1, 1), Some(dec!(2)), None, None));
    late.action.detected_at = ts(99);
    assert!(early.application_cmp(&late).is_lt());
}
