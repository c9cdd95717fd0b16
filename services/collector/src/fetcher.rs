//! Settlement transaction fetch loop
//!
//! Each cycle asks the store which referenced settlement hashes are still
//! unresolved, fetches their metadata in bounded chunks, and persists the
//! results idempotently. Runs independently of the event collector; a
//! commitment simply stays out of the derived views until both sides
//! exist, so no cross-loop coordination is needed.

use std::sync::Arc;
use std::time::Duration;

use timeseries_store::TimeSeriesStore;
use tokio::sync::watch;
use tracing::{error, info};

use crate::sources::SettlementSource;

/// Upstream request size limit per chunk of hashes.
pub const HASH_CHUNK_SIZE: usize = 2500;

/// Per-cycle outcome counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetcherCycle {
    /// Unresolved hashes the cycle started with.
    pub pending: usize,
    /// Transactions returned by the source.
    pub fetched: usize,
    /// Transactions newly inserted.
    pub inserted: usize,
    /// Chunks that failed and will be retried next cycle.
    pub failed_chunks: usize,
}

/// Continuously resolves settlement transactions for stored commitments.
pub struct SettlementTxFetcher<S> {
    source: S,
    store: Arc<TimeSeriesStore>,
    interval: Duration,
    chunk_size: usize,
}

impl<S: SettlementSource> SettlementTxFetcher<S> {
    pub fn new(source: S, store: Arc<TimeSeriesStore>, interval: Duration) -> Self {
        Self {
            source,
            store,
            interval,
            chunk_size: HASH_CHUNK_SIZE,
        }
    }

    #[cfg(test)]
    fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Run exactly one fetch cycle. Never fails; chunk errors are counted
    /// and retried on the next cycle.
    pub async fn run_once(&self) -> FetcherCycle {
        let mut cycle = FetcherCycle::default();

        let pending = match self.store.unresolved_txn_hashes() {
            Ok(hashes) => hashes,
            Err(e) => {
                error!(error = %e, "failed to query unresolved hashes");
                return cycle;
            }
        };
        cycle.pending = pending.len();
        if pending.is_empty() {
            info!("no unresolved settlement hashes");
            return cycle;
        }

        for chunk in pending.chunks(self.chunk_size) {
            match self.source.fetch_transactions(chunk).await {
                Ok(txs) => {
                    cycle.fetched += txs.len();
                    for tx in txs {
                        match self.store.put_settlement(tx) {
                            Ok(outcome) if outcome.is_inserted() => cycle.inserted += 1,
                            Ok(_) => {}
                            Err(e) => {
                                error!(error = %e, "failed to persist settlement transaction");
                            }
                        }
                    }
                }
                Err(e) => {
                    cycle.failed_chunks += 1;
                    error!(
                        chunk_len = chunk.len(),
                        error = %e,
                        "settlement chunk failed, retrying next cycle"
                    );
                }
            }
        }

        info!(
            pending = cycle.pending,
            fetched = cycle.fetched,
            inserted = cycle.inserted,
            failed_chunks = cycle.failed_chunks,
            "settlement fetch cycle complete"
        );
        cycle
    }

    /// Run until `shutdown` flips to true, draining the in-flight cycle.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_secs = self.interval.as_secs(),
            "settlement tx fetcher started"
        );
        loop {
            if *shutdown.borrow() {
                break;
            }
            self.run_once().await;
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = shutdown.changed() => {}
            }
            if *shutdown.borrow() {
                break;
            }
        }
        info!("settlement tx fetcher stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::SourceError;
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::Mutex;
    use types::events::{OpenedCommitment, SettlementTransaction};
    use types::ids::{CommitmentIndex, TxHash};

    /// Source serving a fixed hash→transaction map, optionally failing
    /// the first N calls.
    struct MapSource {
        txs: BTreeMap<TxHash, SettlementTransaction>,
        fail_first: Mutex<usize>,
    }

    impl MapSource {
        fn new(txs: Vec<SettlementTransaction>) -> Self {
            Self {
                txs: txs.into_iter().map(|tx| (tx.hash.clone(), tx)).collect(),
                fail_first: Mutex::new(0),
            }
        }

        fn failing_first(self, calls: usize) -> Self {
            *self.fail_first.lock().unwrap() = calls;
            self
        }
    }

    #[async_trait]
    impl SettlementSource for MapSource {
        async fn fetch_transactions(
            &self,
            hashes: &[TxHash],
        ) -> Result<Vec<SettlementTransaction>, SourceError> {
            {
                let mut fail = self.fail_first.lock().unwrap();
                if *fail > 0 {
                    *fail -= 1;
                    return Err(SourceError::Transport("scripted failure".to_string()));
                }
            }
            Ok(hashes
                .iter()
                .filter_map(|h| self.txs.get(h).cloned())
                .collect())
        }
    }

    fn opened(index: u64, txn_hash: &str) -> OpenedCommitment {
        OpenedCommitment {
            commitment_index: CommitmentIndex::new(index),
            txn_hash: txn_hash.to_string(),
            bidder: "0xb1dder".to_string(),
            bid: 10,
            decay_start_timestamp: 0,
            decay_end_timestamp: 100,
            dispatch_timestamp: 50,
            block_number: index,
        }
    }

    fn settlement(hash: &str, block: u64) -> SettlementTransaction {
        SettlementTransaction {
            hash: TxHash::normalize(hash),
            timestamp_ms: 1_700_000_000_000,
            extra_data: "builder".to_string(),
            block_number: block,
        }
    }

    #[tokio::test]
    async fn test_resolves_pending_hashes() {
        let store = Arc::new(TimeSeriesStore::in_memory());
        store.put_opened(opened(1, "abc")).unwrap();
        store.put_opened(opened(2, "def")).unwrap();

        let source = MapSource::new(vec![settlement("abc", 90), settlement("def", 91)]);
        let fetcher = SettlementTxFetcher::new(source, store.clone(), Duration::from_secs(30));

        let cycle = fetcher.run_once().await;
        assert_eq!(cycle.pending, 2);
        assert_eq!(cycle.inserted, 2);
        assert!(store.unresolved_txn_hashes().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_hashes_stay_pending() {
        let store = Arc::new(TimeSeriesStore::in_memory());
        store.put_opened(opened(1, "abc")).unwrap();
        store.put_opened(opened(2, "unknown")).unwrap();

        let source = MapSource::new(vec![settlement("abc", 90)]);
        let fetcher = SettlementTxFetcher::new(source, store.clone(), Duration::from_secs(30));

        let cycle = fetcher.run_once().await;
        assert_eq!(cycle.pending, 2);
        assert_eq!(cycle.inserted, 1);
        // The unknown hash is not an error; it is simply still pending.
        assert_eq!(cycle.failed_chunks, 0);
        assert_eq!(store.unresolved_txn_hashes().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_chunk_skips_but_later_chunks_run() {
        let store = Arc::new(TimeSeriesStore::in_memory());
        store.put_opened(opened(1, "abc")).unwrap();
        store.put_opened(opened(2, "def")).unwrap();

        let source = MapSource::new(vec![settlement("abc", 90), settlement("def", 91)])
            .failing_first(1);
        let fetcher = SettlementTxFetcher::new(source, store.clone(), Duration::from_secs(30))
            .with_chunk_size(1);

        let cycle = fetcher.run_once().await;
        assert_eq!(cycle.failed_chunks, 1);
        assert_eq!(cycle.inserted, 1);

        // Next cycle retries what the failed chunk left behind.
        let cycle = fetcher.run_once().await;
        assert_eq!(cycle.failed_chunks, 0);
        assert_eq!(cycle.inserted, 1);
        assert!(store.unresolved_txn_hashes().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_pending_is_quiet() {
        let store = Arc::new(TimeSeriesStore::in_memory());
        let source = MapSource::new(Vec::new());
        let fetcher = SettlementTxFetcher::new(source, store, Duration::from_secs(30));

        let cycle = fetcher.run_once().await;
        assert_eq!(cycle, FetcherCycle::default());
    }
}
