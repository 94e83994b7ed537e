//! Writes racing a cost-basis method change on the same portfolio.

use rust_decimal_macros::dec;
use std::sync::{Arc, Barrier};
use std::thread;

use foliotrack_core::errors::Result;
use foliotrack_core::imports::{CommitPolicy, ImportRequest, ImportService, ImportServiceTrait};
use foliotrack_core::portfolios::{
    CostBasisMethod, NewPortfolio, Portfolio, PortfolioServiceTrait, PortfolioUpdate,
};
use foliotrack_core::query::{GainQuery, PortfolioQueryServiceTrait};
use foliotrack_core::transactions::{
    TransactionFilter, TransactionService, TransactionServiceTrait, TransactionType,
};
use foliotrack_core::RequestContext;
use foliotrack_storage_memory::event_store::EventStore;
use foliotrack_storage_memory::imports::ImportBatchRepository;
use foliotrack_storage_memory::transactions::TransactionRepository;

mod common;
use common::*;

/// Switches the method right after handing out the portfolio it read, the
/// way a concurrent update lands between authorization and the write lock.
struct SwitchAfterAuthorize {
    inner: Arc<dyn PortfolioServiceTrait>,
    switch_to: CostBasisMethod,
}

impl PortfolioServiceTrait for SwitchAfterAuthorize {
    fn create_portfolio(&self, ctx: &RequestContext, new_portfolio: NewPortfolio) -> Result<Portfolio> {
        self.inner.create_portfolio(ctx, new_portfolio)
    }

    fn update_portfolio(&self, ctx: &RequestContext, update: PortfolioUpdate) -> Result<Portfolio> {
        self.inner.update_portfolio(ctx, update)
    }

    fn delete_portfolio(&self, ctx: &RequestContext, portfolio_id: &str) -> Result<()> {
        self.inner.delete_portfolio(ctx, portfolio_id)
    }

    fn get_portfolio(&self, ctx: &RequestContext, portfolio_id: &str) -> Result<Portfolio> {
        self.inner.get_portfolio(ctx, portfolio_id)
    }

    fn list_portfolios(&self, ctx: &RequestContext) -> Result<Vec<Portfolio>> {
        self.inner.list_portfolios(ctx)
    }

    fn authorize(&self, ctx: &RequestContext, portfolio_id: &str) -> Result<Portfolio> {
        let read = self.inner.authorize(ctx, portfolio_id)?;
        self.inner
            .update_portfolio(ctx, method_update(portfolio_id, self.switch_to))?;
        Ok(read)
    }
}

fn method_update(portfolio_id: &str, method: CostBasisMethod) -> PortfolioUpdate {
    PortfolioUpdate {
        id: portfolio_id.to_string(),
        name: None,
        base_currency: None,
        cost_basis_method: Some(method),
    }
}

fn switching(t: &TestEngine, switch_to: CostBasisMethod) -> Arc<dyn PortfolioServiceTrait> {
    Arc::new(SwitchAfterAuthorize {
        inner: t.engine.portfolio_service.clone(),
        switch_to,
    })
}

fn transaction_service(t: &TestEngine, switch_to: CostBasisMethod) -> TransactionService {
    TransactionService::new(
        switching(t, switch_to),
        Arc::new(TransactionRepository::new(t.engine.db.clone())),
        t.engine.ledger_service.clone(),
        Arc::new(EventStore::new(t.engine.db.clone())),
        t.engine.locks.clone(),
    )
}

fn import_service(t: &TestEngine, switch_to: CostBasisMethod) -> ImportService {
    ImportService::new(
        switching(t, switch_to),
        Arc::new(ImportBatchRepository::new(t.engine.db.clone())),
        Arc::new(TransactionRepository::new(t.engine.db.clone())),
        t.engine.ledger_service.clone(),
        Arc::new(EventStore::new(t.engine.db.clone())),
        t.engine.locks.clone(),
    )
}

fn stored_method(t: &TestEngine, portfolio_id: &str) -> CostBasisMethod {
    t.engine
        .portfolio_service
        .get_portfolio(&t.ctx, portfolio_id)
        .unwrap()
        .cost_basis_method
}

fn sold_lots(t: &TestEngine, portfolio_id: &str) -> Vec<String> {
    t.engine
        .query_service
        .realized_gains(&t.ctx, portfolio_id, &GainQuery::default())
        .unwrap()
        .into_iter()
        .map(|gain| gain.lot_id)
        .collect()
}

#[test]
fn test_sale_uses_method_switched_before_lock() {
    let t = setup();
    let p = t.portfolio(CostBasisMethod::Fifo);
    let oldest = t.buy(&p.id, "AAPL", d(2024, 1, 2), dec!(5), dec!(100));
    let newest = t.buy(&p.id, "AAPL", d(2024, 2, 1), dec!(5), dec!(120));

    let service = transaction_service(&t, CostBasisMethod::Lifo);
    service
        .create_transaction(
            &t.ctx,
            &p.id,
            trade(TransactionType::Sell, "AAPL", d(2024, 3, 1), dec!(2), dec!(130)),
        )
        .unwrap();

    assert_eq!(stored_method(&t, &p.id), CostBasisMethod::Lifo);
    assert_eq!(sold_lots(&t, &p.id), vec![newest.id.clone()]);
    assert_ne!(newest.id, oldest.id);

    let err = t
        .engine
        .portfolio_service
        .update_portfolio(&t.ctx, method_update(&p.id, CostBasisMethod::Fifo))
        .unwrap_err();
    assert_eq!(err.code(), "METHOD_LOCKED");
}

#[test]
fn test_sale_without_selections_rejected_after_switch_to_specific_lot() {
    let t = setup();
    let p = t.portfolio(CostBasisMethod::Fifo);
    t.buy(&p.id, "AAPL", d(2024, 1, 2), dec!(5), dec!(100));

    let service = transaction_service(&t, CostBasisMethod::SpecificLot);
    let err = service
        .create_transaction(
            &t.ctx,
            &p.id,
            trade(TransactionType::Sell, "AAPL", d(2024, 3, 1), dec!(2), dec!(130)),
        )
        .unwrap_err();

    assert_eq!(err.code(), "VALIDATION_ERROR");
    assert_eq!(stored_method(&t, &p.id), CostBasisMethod::SpecificLot);
    assert!(sold_lots(&t, &p.id).is_empty());
}

#[test]
fn test_import_uses_method_switched_before_lock() {
    let t = setup();
    let p = t.portfolio(CostBasisMethod::Fifo);
    t.buy(&p.id, "AAPL", d(2024, 1, 2), dec!(5), dec!(100));

    let result = import_service(&t, CostBasisMethod::SpecificLot)
        .import_transactions(
            &t.ctx,
            &p.id,
            ImportRequest {
                batch_id: None,
                source: "csv:late.csv".to_string(),
                records: vec![
                    trade(TransactionType::Buy, "AAPL", d(2024, 2, 1), dec!(1), dec!(110)),
                    trade(TransactionType::Sell, "AAPL", d(2024, 3, 1), dec!(2), dec!(130)),
                ],
                policy: CommitPolicy::AllOrNothing,
            },
        )
        .unwrap();

    assert!(!result.committed);
    let failed: Vec<_> = result.errors().collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].row, 2);
    assert_eq!(
        failed[0].error.as_ref().map(|e| e.code.as_str()),
        Some("VALIDATION_ERROR")
    );
    assert_eq!(
        t.engine
            .transaction_service
            .list_transactions(&t.ctx, &p.id, TransactionFilter::default())
            .unwrap()
            .len(),
        1
    );
}

#[test]
fn test_method_change_and_sale_never_both_win() {
    let t = setup();

    for _ in 0..25 {
        let p = t.portfolio(CostBasisMethod::Fifo);
        let oldest = t.buy(&p.id, "AAPL", d(2024, 1, 2), dec!(5), dec!(100));
        let newest = t.buy(&p.id, "AAPL", d(2024, 2, 1), dec!(5), dec!(120));
        let barrier = Barrier::new(2);

        let (switched, sold) = thread::scope(|scope| {
            let switch = scope.spawn(|| {
                barrier.wait();
                t.engine
                    .portfolio_service
                    .update_portfolio(&t.ctx, method_update(&p.id, CostBasisMethod::Lifo))
            });
            let sale = scope.spawn(|| {
                barrier.wait();
                t.engine.transaction_service.create_transaction(
                    &t.ctx,
                    &p.id,
                    trade(TransactionType::Sell, "AAPL", d(2024, 3, 1), dec!(2), dec!(130)),
                )
            });
            (switch.join().unwrap(), sale.join().unwrap())
        });

        sold.unwrap();
        let lots = sold_lots(&t, &p.id);
        match switched {
            Ok(portfolio) => {
                assert_eq!(portfolio.cost_basis_method, CostBasisMethod::Lifo);
                assert_eq!(lots, vec![newest.id.clone()]);
            }
            Err(err) => {
                assert_eq!(err.code(), "METHOD_LOCKED");
                assert_eq!(stored_method(&t, &p.id), CostBasisMethod::Fifo);
                assert_eq!(lots, vec![oldest.id.clone()]);
            }
        }
    }
}
