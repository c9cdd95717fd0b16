//! The TimeSeriesStore
//!
//! Holds the four base tables behind a single `RwLock`, journals every
//! accepted insert before it becomes visible, and answers the set-based
//! queries the collectors and the view refresher are built on. The store
//! is the only shared mutable resource in the pipeline; callers hold no
//! locks of their own.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Mutex, RwLock};

use tracing::info;
use types::events::{
    CommitmentProcessed, EncryptedCommitment, EventKind, OpenedCommitment, ProtocolEvent,
    SettlementTransaction,
};
use types::ids::{CommitmentIndex, TxHash};

use crate::error::StoreError;
use crate::journal::{Journal, JournalRecord};
use crate::registry::ViewRegistry;
use crate::tables::{PutOutcome, Table};

// ── Tables ──────────────────────────────────────────────────────────

#[derive(Default)]
struct BaseTables {
    encrypted: Table<CommitmentIndex, EncryptedCommitment>,
    opened: Table<CommitmentIndex, OpenedCommitment>,
    processed: Table<CommitmentIndex, CommitmentProcessed>,
    settlement: Table<TxHash, SettlementTransaction>,
}

/// Row counts per base table, for cycle logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableCounts {
    pub encrypted: usize,
    pub opened: usize,
    pub processed: usize,
    pub settlement: usize,
}

/// A commitment with all three lifecycle stages present and its settlement
/// transaction resolved. The inner-join unit the derived views are built
/// from; partially observed commitments never produce one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelatedCommitment {
    pub encrypted: EncryptedCommitment,
    pub opened: OpenedCommitment,
    pub processed: CommitmentProcessed,
    pub settlement: SettlementTransaction,
}

// ── Store ───────────────────────────────────────────────────────────

/// Durable, idempotent store for protocol events and settlement
/// transactions, hosting the materialized view registry.
pub struct TimeSeriesStore {
    tables: RwLock<BaseTables>,
    journal: Option<Mutex<Journal>>,
    views: ViewRegistry,
}

impl TimeSeriesStore {
    /// Open a journal-backed store in `dir`, replaying any existing
    /// journal to rebuild table state.
    pub fn open(dir: &Path) -> Result<Self, StoreError> {
        let records = Journal::replay(dir)?;
        let journal = Journal::open(dir)?;

        let mut tables = BaseTables::default();
        for record in records {
            match record {
                JournalRecord::Encrypted(e) => {
                    tables.encrypted.put(e.commitment_index, e);
                }
                JournalRecord::Opened(e) => {
                    tables.opened.put(e.commitment_index, e);
                }
                JournalRecord::Processed(e) => {
                    tables.processed.put(e.commitment_index, e);
                }
                JournalRecord::Settlement(tx) => {
                    tables.settlement.put(tx.hash.clone(), tx);
                }
            }
        }

        let store = Self {
            tables: RwLock::new(tables),
            journal: Some(Mutex::new(journal)),
            views: ViewRegistry::new(),
        };
        let counts = store.counts()?;
        info!(?counts, dir = %dir.display(), "time-series store opened");
        Ok(store)
    }

    /// Ephemeral store with no journal. Used in tests and tooling.
    pub fn in_memory() -> Self {
        Self {
            tables: RwLock::new(BaseTables::default()),
            journal: None,
            views: ViewRegistry::new(),
        }
    }

    /// The materialized view registry hosted by this store.
    pub fn views(&self) -> &ViewRegistry {
        &self.views
    }

    /// Liveness probe. Verifies the journal is writable when one exists.
    pub fn ping(&self) -> Result<(), StoreError> {
        if let Some(journal) = &self.journal {
            let mut journal = journal.lock().map_err(|_| StoreError::LockPoisoned)?;
            journal.sync()?;
        }
        Ok(())
    }

    // ── Writes ──────────────────────────────────────────────────────

    /// Idempotently persist a protocol event of any kind.
    pub fn put_event(&self, event: &ProtocolEvent) -> Result<PutOutcome, StoreError> {
        match event {
            ProtocolEvent::Encrypted(e) => self.put_encrypted(e.clone()),
            ProtocolEvent::Opened(e) => self.put_opened(e.clone()),
            ProtocolEvent::Processed(e) => self.put_processed(e.clone()),
        }
    }

    pub fn put_encrypted(&self, row: EncryptedCommitment) -> Result<PutOutcome, StoreError> {
        let mut tables = self.tables.write().map_err(|_| StoreError::LockPoisoned)?;
        if tables.encrypted.contains(&row.commitment_index) {
            return Ok(PutOutcome::AlreadyPresent);
        }
        self.journal_append(JournalRecord::Encrypted(row.clone()))?;
        Ok(tables.encrypted.put(row.commitment_index, row))
    }

    pub fn put_opened(&self, row: OpenedCommitment) -> Result<PutOutcome, StoreError> {
        let mut tables = self.tables.write().map_err(|_| StoreError::LockPoisoned)?;
        if tables.opened.contains(&row.commitment_index) {
            return Ok(PutOutcome::AlreadyPresent);
        }
        self.journal_append(JournalRecord::Opened(row.clone()))?;
        Ok(tables.opened.put(row.commitment_index, row))
    }

    pub fn put_processed(&self, row: CommitmentProcessed) -> Result<PutOutcome, StoreError> {
        let mut tables = self.tables.write().map_err(|_| StoreError::LockPoisoned)?;
        if tables.processed.contains(&row.commitment_index) {
            return Ok(PutOutcome::AlreadyPresent);
        }
        self.journal_append(JournalRecord::Processed(row.clone()))?;
        Ok(tables.processed.put(row.commitment_index, row))
    }

    pub fn put_settlement(&self, row: SettlementTransaction) -> Result<PutOutcome, StoreError> {
        let mut tables = self.tables.write().map_err(|_| StoreError::LockPoisoned)?;
        if tables.settlement.contains(&row.hash) {
            return Ok(PutOutcome::AlreadyPresent);
        }
        self.journal_append(JournalRecord::Settlement(row.clone()))?;
        Ok(tables.settlement.put(row.hash.clone(), row))
    }

    fn journal_append(&self, record: JournalRecord) -> Result<(), StoreError> {
        if let Some(journal) = &self.journal {
            let mut journal = journal.lock().map_err(|_| StoreError::LockPoisoned)?;
            journal.append(&record)?;
        }
        Ok(())
    }

    // ── Reads ───────────────────────────────────────────────────────

    /// Highest stored block number for an event kind; 0 when the table is
    /// empty. The collectors resume fetching from the next block.
    pub fn max_block_number(&self, kind: EventKind) -> Result<u64, StoreError> {
        let tables = self.tables.read().map_err(|_| StoreError::LockPoisoned)?;
        let max = match kind {
            EventKind::EncryptedCommitment => tables
                .encrypted
                .iter()
                .map(|(_, r)| r.block_number)
                .max(),
            EventKind::OpenedCommitment => {
                tables.opened.iter().map(|(_, r)| r.block_number).max()
            }
            EventKind::CommitmentProcessed => {
                tables.processed.iter().map(|(_, r)| r.block_number).max()
            }
        };
        Ok(max.unwrap_or(0))
    }

    /// Settlement hashes referenced by opened commitments that have no
    /// stored settlement transaction yet, in canonical form, deduplicated.
    pub fn unresolved_txn_hashes(&self) -> Result<Vec<TxHash>, StoreError> {
        let tables = self.tables.read().map_err(|_| StoreError::LockPoisoned)?;
        let pending: BTreeSet<TxHash> = tables
            .opened
            .iter()
            .map(|(_, r)| r.settlement_hash())
            .filter(|hash| !tables.settlement.contains(hash))
            .collect();
        Ok(pending.into_iter().collect())
    }

    /// Inner join of all four base tables, in commitment-index order.
    ///
    /// A commitment appears exactly when all three lifecycle stages are
    /// stored and its settlement transaction is resolved; anything partial
    /// is silently excluded.
    pub fn correlated_commitments(&self) -> Result<Vec<CorrelatedCommitment>, StoreError> {
        let tables = self.tables.read().map_err(|_| StoreError::LockPoisoned)?;
        let mut joined = Vec::new();
        for (index, encrypted) in tables.encrypted.iter() {
            let Some(opened) = tables.opened.get(index) else {
                continue;
            };
            let Some(processed) = tables.processed.get(index) else {
                continue;
            };
            let Some(settlement) = tables.settlement.get(&opened.settlement_hash()) else {
                continue;
            };
            joined.push(CorrelatedCommitment {
                encrypted: encrypted.clone(),
                opened: opened.clone(),
                processed: processed.clone(),
                settlement: settlement.clone(),
            });
        }
        Ok(joined)
    }

    pub fn counts(&self) -> Result<TableCounts, StoreError> {
        let tables = self.tables.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(TableCounts {
            encrypted: tables.encrypted.len(),
            opened: tables.opened.len(),
            processed: tables.processed.len(),
            settlement: tables.settlement.len(),
        })
    }
}
