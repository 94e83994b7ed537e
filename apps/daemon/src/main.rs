mod config;
mod main_lib;
mod scheduler;

use config::Config;
use main_lib::{build_engine, init_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env();
    init_tracing(&config);
    let engine = build_engine(&config)?;

    let scheduler = scheduler::start_snapshot_scheduler(engine, config.clone());
    tracing::info!("Snapshot scheduler running; press Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;
    scheduler.abort();
    tracing::info!("Shutting down");
    Ok(())
}
