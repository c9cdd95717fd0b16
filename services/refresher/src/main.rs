//! Refresher process entrypoint
//!
//! Independently deployable from the collectors: opens the shared store,
//! then hands control to the scheduler, which waits for readiness once
//! and refreshes the declared views until terminated.

use std::sync::Arc;
use std::time::Duration;

use timeseries_store::TimeSeriesStore;
use tokio::sync::watch;
use tracing::{info, warn};
use view_refresher::config::RefresherConfig;
use view_refresher::{MaterializedViewManager, RefreshScheduler};

/// Fixed backoff while the store journal is unreachable at boot.
const STORE_RETRY: Duration = Duration::from_secs(2);

async fn open_store(config: &RefresherConfig) -> Arc<TimeSeriesStore> {
    loop {
        match TimeSeriesStore::open(&config.data_dir) {
            Ok(store) => return Arc::new(store),
            Err(e) => {
                warn!(error = %e, "store not ready, retrying");
                tokio::time::sleep(STORE_RETRY).await;
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt::init();

    let config = RefresherConfig::from_env();
    info!(?config, "starting refresher process");

    let store = open_store(&config).await;
    let manager = MaterializedViewManager::new(store);
    let scheduler = RefreshScheduler::new(manager)
        .with_intervals(config.ready_poll, config.cycle_interval);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(scheduler.run(shutdown_rx));

    tokio::signal::ctrl_c().await?;
    info!("termination requested, draining scheduler");
    let _ = shutdown_tx.send(true);
    task.await?;

    info!("refresher process exited cleanly");
    Ok(())
}
