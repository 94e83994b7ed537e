#![allow(dead_code)]

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::sync::Arc;

use foliotrack_core::corporate_actions::{
    CorporateAction, CorporateActionServiceTrait, CorporateActionType, NewCorporateAction,
};
use foliotrack_core::portfolios::{CostBasisMethod, NewPortfolio, Portfolio, PortfolioServiceTrait};
use foliotrack_core::transactions::{
    NewTransaction, Transaction, TransactionServiceTrait, TransactionType,
};
use foliotrack_core::RequestContext;
use foliotrack_storage_memory::{Engine, StaticPriceOracle};

pub const OWNER: &str = "alice";
pub const STRANGER: &str = "mallory";

pub struct TestEngine {
    pub engine: Engine,
    pub prices: Arc<StaticPriceOracle>,
    pub ctx: RequestContext,
}

pub fn setup() -> TestEngine {
    let prices = Arc::new(StaticPriceOracle::new());
    let engine = Engine::in_memory(prices.clone());
    TestEngine {
        engine,
        prices,
        ctx: RequestContext::new(OWNER),
    }
}

pub fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

impl TestEngine {
    pub fn portfolio(&self, method: CostBasisMethod) -> Portfolio {
        self.engine
            .portfolio_service
            .create_portfolio(
                &self.ctx,
                NewPortfolio {
                    id: None,
                    name: "Brokerage".to_string(),
                    base_currency: "USD".to_string(),
                    cost_basis_method: method,
                },
            )
            .unwrap()
    }

    pub fn record(&self, portfolio_id: &str, new_transaction: NewTransaction) -> Transaction {
        self.engine
            .transaction_service
            .create_transaction(&self.ctx, portfolio_id, new_transaction)
            .unwrap()
    }

    pub fn buy(
        &self,
        portfolio_id: &str,
        symbol: &str,
        date: NaiveDate,
        quantity: Decimal,
        price: Decimal,
    ) -> Transaction {
        self.record(portfolio_id, trade(TransactionType::Buy, symbol, date, quantity, price))
    }

    pub fn sell(
        &self,
        portfolio_id: &str,
        symbol: &str,
        date: NaiveDate,
        quantity: Decimal,
        price: Decimal,
    ) -> Transaction {
        self.record(portfolio_id, trade(TransactionType::Sell, symbol, date, quantity, price))
    }

    pub fn deposit(&self, portfolio_id: &str, date: NaiveDate, amount: Decimal) -> Transaction {
        self.record(portfolio_id, cash(TransactionType::Deposit, date, amount))
    }

    pub fn register_action(
        &self,
        symbol: &str,
        action_type: CorporateActionType,
        date: NaiveDate,
        ratio: Option<Decimal>,
        amount: Option<Decimal>,
        new_symbol: Option<&str>,
    ) -> CorporateAction {
        self.engine
            .corporate_action_service
            .create_corporate_action(NewCorporateAction {
                id: None,
                symbol: symbol.to_string(),
                action_type,
                date,
                ratio,
                amount,
                new_symbol: new_symbol.map(str::to_string),
                currency: Some("USD".to_string()),
            })
            .unwrap()
    }

    pub fn close(&self, symbol: &str, date: NaiveDate, close: Decimal) {
        self.prices.insert_close(symbol, date, close, "USD").unwrap();
    }
}

pub fn trade(
    transaction_type: TransactionType,
    symbol: &str,
    date: NaiveDate,
    quantity: Decimal,
    price: Decimal,
) -> NewTransaction {
    NewTransaction {
        id: None,
        transaction_type,
        symbol: Some(symbol.to_string()),
        date,
        quantity,
        price: Some(price),
        commission: Decimal::ZERO,
        currency: None,
        notes: None,
        lot_selections: None,
    }
}

pub fn cash(transaction_type: TransactionType, date: NaiveDate, amount: Decimal) -> NewTransaction {
    NewTransaction {
        id: None,
        transaction_type,
        symbol: None,
        date,
        quantity: amount,
        price: None,
        commission: Decimal::ZERO,
        currency: None,
        notes: None,
        lot_selections: None,
    }
}

/// An engine whose domain events are recorded.
pub fn setup_with_events() -> (TestEngine, foliotrack_core::events::MockDomainEventSink) {
    let prices = Arc::new(StaticPriceOracle::new());
    let sink = foliotrack_core::events::MockDomainEventSink::new();
    let engine = Engine::new(
        Arc::new(foliotrack_storage_memory::MemoryDb::new()),
        prices.clone(),
        Arc::new(sink.clone()),
    );
    (
        TestEngine {
            engine,
            prices,
            ctx: RequestContext::new(OWNER),
        },
        sink,
    )
}
