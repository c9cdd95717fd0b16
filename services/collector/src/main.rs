//! Collector process entrypoint
//!
//! Boots both collection loops together, forwards SIGINT to them through
//! a watch channel, and waits for both to drain before exiting.

use std::sync::Arc;
use std::time::Duration;

use event_collector::config::CollectorConfig;
use event_collector::http::{HttpEventSource, HttpSettlementSource};
use event_collector::{EventCollector, SettlementTxFetcher};
use timeseries_store::TimeSeriesStore;
use tokio::sync::watch;
use tracing::{info, warn};

/// Fixed backoff while the store is unreachable at boot.
const STORE_RETRY: Duration = Duration::from_secs(2);

async fn open_store(config: &CollectorConfig) -> Arc<TimeSeriesStore> {
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

    let config = CollectorConfig::from_env();
    info!(?config, "starting collector process");

    let store = open_store(&config).await;

    let event_source = HttpEventSource::new(&config.event_source_url, config.request_timeout)?;
    let settlement_source =
        HttpSettlementSource::new(&config.settlement_source_url, config.request_timeout)?;

    let collector = Arc::new(EventCollector::new(
        event_source,
        store.clone(),
        config.event_interval,
    ));
    let fetcher = Arc::new(SettlementTxFetcher::new(
        settlement_source,
        store.clone(),
        config.settlement_interval,
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let collector_task = tokio::spawn({
        let collector = collector.clone();
        let shutdown = shutdown_rx.clone();
        async move { collector.run(shutdown).await }
    });
    let fetcher_task = tokio::spawn({
        let fetcher = fetcher.clone();
        let shutdown = shutdown_rx;
        async move { fetcher.run(shutdown).await }
    });

    tokio::signal::ctrl_c().await?;
    info!("termination requested, draining collection loops");
    let _ = shutdown_tx.send(true);

    collector_task.await?;
    fetcher_task.await?;
    info!("collector process exited cleanly");
    Ok(())
}
