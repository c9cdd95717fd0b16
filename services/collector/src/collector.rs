//! Protocol event collection loop
//!
//! One cycle fetches each event kind independently, resuming from the
//! highest stored block number per kind, and writes every returned event
//! through the store's idempotent put. A failure on one kind is logged and
//! does not stop the remaining kinds in the same cycle; the fixed cycle
//! interval is the retry interval. Nothing here is ever fatal to the
//! process.

use std::sync::Arc;
use std::time::Duration;

use timeseries_store::TimeSeriesStore;
use tokio::sync::watch;
use tracing::{error, info};
use types::events::EventKind;

use crate::sources::EventSource;

/// Per-cycle outcome counters, for logging and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectorCycle {
    /// Events returned by the source across all kinds.
    pub fetched: usize,
    /// Events newly inserted into the store.
    pub inserted: usize,
    /// Events the store already knew (idempotent no-ops).
    pub duplicates: usize,
    /// Kinds whose fetch or persist step failed this cycle.
    pub failed_kinds: usize,
}

/// Continuously pulls protocol events into the time-series store.
pub struct EventCollector<S> {
    source: S,
    store: Arc<TimeSeriesStore>,
    interval: Duration,
}

impl<S: EventSource> EventCollector<S> {
    pub fn new(source: S, store: Arc<TimeSeriesStore>, interval: Duration) -> Self {
        Self {
            source,
            store,
            interval,
        }
    }

    /// Run exactly one collection cycle. Never fails; per-kind errors are
    /// absorbed into the cycle counters.
    pub async fn run_once(&self) -> CollectorCycle {
        let mut cycle = CollectorCycle::default();

        for &kind in EventKind::all() {
            match self.collect_kind(kind).await {
                Ok((fetched, inserted)) => {
                    cycle.fetched += fetched;
                    cycle.inserted += inserted;
                    cycle.duplicates += fetched - inserted;
                }
                Err(e) => {
                    cycle.failed_kinds += 1;
                    error!(kind = %kind, error = %e, "event kind failed, retrying next cycle");
                }
            }
        }

        info!(
            fetched = cycle.fetched,
            inserted = cycle.inserted,
            duplicates = cycle.duplicates,
            failed_kinds = cycle.failed_kinds,
            "event collection cycle complete"
        );
        cycle
    }

    async fn collect_kind(&self, kind: EventKind) -> Result<(usize, usize), anyhow::Error> {
        let max_block = self.store.max_block_number(kind)?;
        let events = self.source.fetch_events(kind, max_block + 1).await?;
        let fetched = events.len();

        let mut inserted = 0;
        for event in &events {
            if self.store.put_event(event)?.is_inserted() {
                inserted += 1;
            }
        }
        Ok((fetched, inserted))
    }

    /// Run until `shutdown` flips to true. An in-flight cycle always
    /// completes before the loop exits (graceful drain).
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(interval_secs = self.interval.as_secs(), "event collector started");
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
        info!("event collector stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::{SourceError, EventSource};
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use types::events::{
        CommitmentProcessed, EncryptedCommitment, OpenedCommitment, ProtocolEvent,
    };
    use types::ids::CommitmentIndex;

    /// Source returning a fixed script per kind, optionally failing one
    /// kind or ignoring the resume cursor entirely.
    struct ScriptedSource {
        events: Mutex<Vec<ProtocolEvent>>,
        failing: HashSet<EventKind>,
        ignore_cursor: bool,
    }

    impl ScriptedSource {
        fn new(events: Vec<ProtocolEvent>) -> Self {
            Self {
                events: Mutex::new(events),
                failing: HashSet::new(),
                ignore_cursor: false,
            }
        }

        fn failing_on(mut self, kind: EventKind) -> Self {
            self.failing.insert(kind);
            self
        }

        /// Re-scan all history on every fetch, like a source with no
        /// notion of a high-water mark.
        fn rescanning(mut self) -> Self {
            self.ignore_cursor = true;
            self
        }
    }

    #[async_trait]
    impl EventSource for ScriptedSource {
        async fn fetch_events(
            &self,
            kind: EventKind,
            from_block: u64,
        ) -> Result<Vec<ProtocolEvent>, SourceError> {
            if self.failing.contains(&kind) {
                return Err(SourceError::Transport("scripted failure".to_string()));
            }
            let events = self.events.lock().unwrap();
            Ok(events
                .iter()
                .filter(|e| {
                    e.kind() == kind && (self.ignore_cursor || e.block_number() >= from_block)
                })
                .cloned()
                .collect())
        }
    }

    fn encrypted(index: u64, block: u64) -> ProtocolEvent {
        ProtocolEvent::Encrypted(EncryptedCommitment {
            commitment_index: CommitmentIndex::new(index),
            committer: "0xc0ffee".to_string(),
            commitment_digest: "0xd1gest".to_string(),
            block_number: block,
        })
    }

    fn opened(index: u64, block: u64) -> ProtocolEvent {
        ProtocolEvent::Opened(OpenedCommitment {
            commitment_index: CommitmentIndex::new(index),
            txn_hash: "abc".to_string(),
            bidder: "0xb1dder".to_string(),
            bid: 10,
            decay_start_timestamp: 0,
            decay_end_timestamp: 100,
            dispatch_timestamp: 50,
            block_number: block,
        })
    }

    fn processed(index: u64, block: u64) -> ProtocolEvent {
        ProtocolEvent::Processed(CommitmentProcessed {
            commitment_index: CommitmentIndex::new(index),
            is_slash: false,
            block_number: block,
        })
    }

    #[tokio::test]
    async fn test_cycle_persists_all_kinds() {
        let store = Arc::new(TimeSeriesStore::in_memory());
        let source = ScriptedSource::new(vec![
            encrypted(1, 10),
            opened(1, 11),
            processed(1, 12),
        ]);
        let collector = EventCollector::new(source, store.clone(), Duration::from_secs(30));

        let cycle = collector.run_once().await;
        assert_eq!(cycle.fetched, 3);
        assert_eq!(cycle.inserted, 3);
        assert_eq!(cycle.failed_kinds, 0);

        let counts = store.counts().unwrap();
        assert_eq!(counts.encrypted, 1);
        assert_eq!(counts.opened, 1);
        assert_eq!(counts.processed, 1);
    }

    #[tokio::test]
    async fn test_rerun_is_idempotent() {
        let store = Arc::new(TimeSeriesStore::in_memory());
        // Source ignores the cursor and re-returns all history every
        // cycle; the store's idempotency is the safety net.
        let source =
            ScriptedSource::new(vec![encrypted(1, 10), encrypted(2, 20)]).rescanning();
        let collector = EventCollector::new(source, store.clone(), Duration::from_secs(30));

        let first = collector.run_once().await;
        assert_eq!(first.inserted, 2);
        assert_eq!(first.duplicates, 0);

        let second = collector.run_once().await;
        assert_eq!(second.fetched, 2);
        assert_eq!(second.inserted, 0);
        assert_eq!(second.duplicates, 2);
        assert_eq!(store.counts().unwrap().encrypted, 2);
    }

    #[tokio::test]
    async fn test_per_kind_failure_isolation() {
        let store = Arc::new(TimeSeriesStore::in_memory());
        let source = ScriptedSource::new(vec![
            encrypted(1, 10),
            opened(1, 11),
            processed(1, 12),
        ])
        .failing_on(EventKind::OpenedCommitment);
        let collector = EventCollector::new(source, store.clone(), Duration::from_secs(30));

        let cycle = collector.run_once().await;
        assert_eq!(cycle.failed_kinds, 1);
        // The other kinds still landed in the same cycle.
        let counts = store.counts().unwrap();
        assert_eq!(counts.encrypted, 1);
        assert_eq!(counts.opened, 0);
        assert_eq!(counts.processed, 1);
    }

    #[tokio::test]
    async fn test_cursor_skips_known_blocks() {
        let store = Arc::new(TimeSeriesStore::in_memory());
        let source = ScriptedSource::new(vec![encrypted(1, 10), encrypted(2, 20)]);
        let collector = EventCollector::new(source, store.clone(), Duration::from_secs(30));

        let first = collector.run_once().await;
        assert_eq!(first.inserted, 2);

        // Everything is at or below the stored max block now.
        let second = collector.run_once().await;
        assert_eq!(second.fetched, 0);
        assert_eq!(second.inserted, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_drains_on_shutdown() {
        let store = Arc::new(TimeSeriesStore::in_memory());
        let source = ScriptedSource::new(vec![encrypted(1, 10)]);
        let collector =
            Arc::new(EventCollector::new(source, store.clone(), Duration::from_secs(30)));

        let (tx, rx) = watch::channel(false);
        let task = tokio::spawn({
            let collector = collector.clone();
            async move { collector.run(rx).await }
        });

        // Let the first cycle complete, then request termination.
        tokio::time::sleep(Duration::from_secs(1)).await;
        tx.send(true).unwrap();
        task.await.unwrap();

        assert_eq!(store.counts().unwrap().encrypted, 1);
    }
}
