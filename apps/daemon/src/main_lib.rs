use std::sync::Arc;

use foliotrack_core::events::{DomainEventSink, LoggingDomainEventSink};
use foliotrack_core::market_data::PriceOracle;
use foliotrack_storage_memory::{Engine, MemoryDb, StaticPriceOracle};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Config;

pub fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if config.log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

/// Loads the state dump and price file, then rebuilds every derived table
/// from the event logs.
pub fn build_engine(config: &Config) -> anyhow::Result<Arc<Engine>> {
    let db = Arc::new(MemoryDb::load(&config.state_path)?);
    tracing::info!("State path in use: {}", config.state_path.display());

    let oracle = match &config.prices_path {
        Some(path) => {
            tracing::info!("Loading prices from {}", path.display());
            StaticPriceOracle::from_path(path)?
        }
        None => {
            tracing::warn!("FT_PRICES_PATH not set; positions will be valued at cost");
            StaticPriceOracle::new()
        }
    };
    let oracle: Arc<dyn PriceOracle> = Arc::new(oracle);
    let sink: Arc<dyn DomainEventSink> = Arc::new(LoggingDomainEventSink);

    let engine = Engine::new(db, oracle, sink);
    let rederived = engine.rederive_all()?;
    tracing::info!("Re-derived {} portfolio(s)", rederived);
    Ok(Arc::new(engine))
}
