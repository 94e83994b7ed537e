//! Background scheduler for the daily snapshotter.

use std::sync::Arc;

use chrono::Utc;
use foliotrack_core::utils::Deadline;
use foliotrack_storage_memory::Engine;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{error, info, warn};

use crate::config::Config;

/// Starts the snapshot loop: waits for the initial delay, then runs once per
/// interval. The first tick fires immediately after the delay.
pub fn start_snapshot_scheduler(engine: Arc<Engine>, config: Config) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            "Snapshot scheduler started ({}s interval)",
            config.snapshot_interval.as_secs()
        );
        tokio::time::sleep(config.snapshot_initial_delay).await;

        let mut ticker = interval(config.snapshot_interval);
        loop {
            ticker.tick().await;
            run_scheduled_snapshots(&engine, &config).await;
        }
    })
}

/// Runs a single snapshot pass and persists the state dump.
async fn run_scheduled_snapshots(engine: &Arc<Engine>, config: &Config) {
    let engine = engine.clone();
    let config = config.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        let today = Utc::now().date_naive();
        let deadline = Deadline::after(config.request_timeout);
        let report = engine
            .snapshot_service
            .run_daily_snapshots(today, &deadline)?;
        engine.db.dump(&config.state_path)?;
        Ok::<_, foliotrack_core::Error>(report)
    })
    .await;

    match outcome {
        Ok(Ok(report)) => {
            for failure in &report.failures {
                warn!(
                    "Snapshot for portfolio {} failed: {} ({})",
                    failure.portfolio_id, failure.error.error, failure.error.code
                );
            }
            info!(
                "Daily snapshots for {}: {} taken, {} already present, {} failed",
                report.date,
                report.taken.len(),
                report.existing.len(),
                report.failures.len()
            );
        }
        Ok(Err(e)) => error!("Scheduled snapshot run failed: {}", e),
        Err(e) => error!("Snapshot task panicked: {}", e),
    }
}
