//! Wires every core service against the in-process store.

use log::{error, info};
use std::sync::Arc;

use crate::corporate_actions::CorporateActionRepository;
use crate::db::MemoryDb;
use crate::event_store::EventStore;
use crate::imports::ImportBatchRepository;
use crate::portfolio::holdings::HoldingsRepository;
use crate::portfolio::lots::LedgerRepository;
use crate::portfolio::snapshot::SnapshotRepository;
use crate::portfolios::PortfolioRepository;
use crate::transactions::TransactionRepository;
use foliotrack_core::corporate_actions::{CorporateActionService, CorporateActionServiceTrait};
use foliotrack_core::errors::Result;
use foliotrack_core::event_store::EventStoreTrait;
use foliotrack_core::events::{DomainEventSink, NoOpDomainEventSink};
use foliotrack_core::imports::{ImportService, ImportServiceTrait};
use foliotrack_core::market_data::{CachedPriceOracle, PriceOracle};
use foliotrack_core::portfolio::holdings::{
    HoldingsService, HoldingsServiceTrait, HoldingsValuationService,
};
use foliotrack_core::portfolio::lots::LedgerService;
use foliotrack_core::portfolio::performance::{PerformanceService, PerformanceServiceTrait};
use foliotrack_core::portfolio::snapshot::{
    SnapshotRepositoryTrait, SnapshotService, SnapshotServiceTrait,
};
use foliotrack_core::portfolio::tax::{TaxService, TaxServiceTrait};
use foliotrack_core::portfolio::valuation::ValuationService;
use foliotrack_core::portfolios::{
    PortfolioLocks, PortfolioRepositoryTrait, PortfolioService, PortfolioServiceTrait,
};
use foliotrack_core::query::{PortfolioQueryService, PortfolioQueryServiceTrait};
use foliotrack_core::transactions::{TransactionService, TransactionServiceTrait};

/// Every service of the engine, sharing one store, one lock table and one
/// cached price oracle.
pub struct Engine {
    pub db: Arc<MemoryDb>,
    pub locks: Arc<PortfolioLocks>,
    pub price_cache: Arc<CachedPriceOracle>,
    pub portfolio_repository: Arc<dyn PortfolioRepositoryTrait>,
    pub ledger_service: Arc<LedgerService>,
    pub portfolio_service: Arc<dyn PortfolioServiceTrait>,
    pub transaction_service: Arc<dyn TransactionServiceTrait>,
    pub corporate_action_service: Arc<dyn CorporateActionServiceTrait>,
    pub import_service: Arc<dyn ImportServiceTrait>,
    pub holdings_service: Arc<dyn HoldingsServiceTrait>,
    pub performance_service: Arc<dyn PerformanceServiceTrait>,
    pub snapshot_service: Arc<dyn SnapshotServiceTrait>,
    pub tax_service: Arc<dyn TaxServiceTrait>,
    pub query_service: Arc<dyn PortfolioQueryServiceTrait>,
}

impl Engine {
    pub fn new(
        db: Arc<MemoryDb>,
        price_oracle: Arc<dyn PriceOracle>,
        event_sink: Arc<dyn DomainEventSink>,
    ) -> Self {
        let locks = Arc::new(PortfolioLocks::new());
        let price_cache = Arc::new(CachedPriceOracle::new(price_oracle));
        let oracle: Arc<dyn PriceOracle> = price_cache.clone();

        let portfolio_repository: Arc<dyn PortfolioRepositoryTrait> =
            Arc::new(PortfolioRepository::new(db.clone()));
        let transaction_repository = Arc::new(TransactionRepository::new(db.clone()));
        let corporate_action_repository = Arc::new(CorporateActionRepository::new(db.clone()));
        let ledger_repository = Arc::new(LedgerRepository::new(db.clone()));
        let holdings_repository = Arc::new(HoldingsRepository::new(db.clone()));
        let snapshot_repository: Arc<dyn SnapshotRepositoryTrait> =
            Arc::new(SnapshotRepository::new(db.clone()));
        let batch_repository = Arc::new(ImportBatchRepository::new(db.clone()));
        let event_store: Arc<dyn EventStoreTrait> = Arc::new(EventStore::new(db.clone()));

        let portfolio_service: Arc<dyn PortfolioServiceTrait> = Arc::new(
            PortfolioService::new(
                portfolio_repository.clone(),
                transaction_repository.clone(),
                locks.clone(),
            )
            .with_event_sink(event_sink.clone()),
        );
        let ledger_service = Arc::new(
            LedgerService::new(
                portfolio_repository.clone(),
                transaction_repository.clone(),
                corporate_action_repository.clone(),
                ledger_repository,
                event_store.clone(),
            )
            .with_event_sink(event_sink.clone()),
        );
        let transaction_service = Arc::new(
            TransactionService::new(
                portfolio_service.clone(),
                transaction_repository.clone(),
                ledger_service.clone(),
                event_store.clone(),
                locks.clone(),
            )
            .with_event_sink(event_sink.clone()),
        );
        let corporate_action_service = Arc::new(
            CorporateActionService::new(
                portfolio_service.clone(),
                corporate_action_repository,
                transaction_repository.clone(),
                ledger_service.clone(),
                event_store.clone(),
                locks.clone(),
            )
            .with_event_sink(event_sink.clone()),
        );
        let import_service = Arc::new(
            ImportService::new(
                portfolio_service.clone(),
                batch_repository,
                transaction_repository,
                ledger_service.clone(),
                event_store,
                locks.clone(),
            )
            .with_event_sink(event_sink.clone()),
        );

        let holdings_service: Arc<dyn HoldingsServiceTrait> = Arc::new(HoldingsService::new(
            portfolio_service.clone(),
            holdings_repository,
            ledger_service.clone(),
            Arc::new(HoldingsValuationService::new(oracle.clone())),
            locks.clone(),
        ));
        let valuation_service = Arc::new(ValuationService::new(oracle.clone()));
        let performance_service: Arc<dyn PerformanceServiceTrait> =
            Arc::new(PerformanceService::new(
                portfolio_service.clone(),
                ledger_service.clone(),
                valuation_service.clone(),
                locks.clone(),
            ));
        let snapshot_service = Arc::new(
            SnapshotService::new(
                portfolio_service.clone(),
                portfolio_repository.clone(),
                ledger_service.clone(),
                valuation_service,
                snapshot_repository.clone(),
                locks.clone(),
            )
            .with_event_sink(event_sink),
        );
        let tax_service: Arc<dyn TaxServiceTrait> = Arc::new(TaxService::new(
            portfolio_service.clone(),
            ledger_service.clone(),
            oracle,
            locks.clone(),
        ));
        let query_service = Arc::new(PortfolioQueryService::new(
            portfolio_service.clone(),
            ledger_service.clone(),
            holdings_service.clone(),
            tax_service.clone(),
            performance_service.clone(),
            snapshot_repository,
            locks.clone(),
        ));

        Self {
            db,
            locks,
            price_cache,
            portfolio_repository,
            ledger_service,
            portfolio_service,
            transaction_service,
            corporate_action_service,
            import_service,
            holdings_service,
            performance_service,
            snapshot_service,
            tax_service,
            query_service,
        }
    }

    /// An empty store without event delivery.
    pub fn in_memory(price_oracle: Arc<dyn PriceOracle>) -> Self {
        Self::new(
            Arc::new(MemoryDb::new()),
            price_oracle,
            Arc::new(NoOpDomainEventSink),
        )
    }

    /// Replays every portfolio's log and stores the result. Portfolios whose
    /// log no longer replays are logged and skipped. Returns how many were
    /// rebuilt.
    pub fn rederive_all(&self) -> Result<usize> {
        let portfolios = self.portfolio_repository.list_all()?;
        let mut rebuilt = 0;
        for portfolio in &portfolios {
            match self
                .locks
                .with_write(&portfolio.id, || self.ledger_service.rederive(portfolio))
            {
                Ok(_) => rebuilt += 1,
                Err(e) => error!("Could not re-derive portfolio {}: {}", portfolio.id, e),
            }
        }
        info!("Re-derived {} of {} portfolio(s)", rebuilt, portfolios.len());
        Ok(rebuilt)
    }
}
