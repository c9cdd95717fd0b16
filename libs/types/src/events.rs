//! Protocol event records and settlement transactions
//!
//! Base entities persisted by the collectors. Each record carries the block
//! number it was observed in, which the collectors use as a resume cursor;
//! the store's natural-key idempotency is the final dedup safety net.
//!
//! Bids are stored as integers in the chain's smallest denomination (wei);
//! conversion to a decimal unit happens only in derived views.

use crate::ids::{CommitmentIndex, TxHash};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The protocol event kinds the collector pulls, in their lifecycle order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    EncryptedCommitment,
    OpenedCommitment,
    CommitmentProcessed,
}

impl EventKind {
    /// All kinds, in the order the collector processes them.
    pub fn all() -> &'static [EventKind] {
        &[
            EventKind::EncryptedCommitment,
            EventKind::OpenedCommitment,
            EventKind::CommitmentProcessed,
        ]
    }

    /// Stable table name for this kind in the time-series store.
    pub fn table_name(&self) -> &'static str {
        match self {
            EventKind::EncryptedCommitment => "encrypted_commitments",
            EventKind::OpenedCommitment => "opened_commitments",
            EventKind::CommitmentProcessed => "commitments_processed",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

/// First lifecycle stage: the commitment exists but is still sealed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedCommitment {
    pub commitment_index: CommitmentIndex,
    pub committer: String,
    pub commitment_digest: String,
    pub block_number: u64,
}

/// Reveal stage: bid terms and the referenced settlement transaction hash.
///
/// `txn_hash` is stored exactly as the protocol reports it (no `0x`
/// prefix); normalization happens at join time via [`TxHash::normalize`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenedCommitment {
    pub commitment_index: CommitmentIndex,
    pub txn_hash: String,
    pub bidder: String,
    /// Bid in the chain's smallest denomination (wei).
    pub bid: u128,
    pub decay_start_timestamp: u64,
    pub decay_end_timestamp: u64,
    pub dispatch_timestamp: u64,
    pub block_number: u64,
}

impl OpenedCommitment {
    /// The settlement transaction hash in canonical join form.
    pub fn settlement_hash(&self) -> TxHash {
        TxHash::normalize(&self.txn_hash)
    }
}

/// Terminal stage: the protocol either honored or slashed the commitment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitmentProcessed {
    pub commitment_index: CommitmentIndex,
    pub is_slash: bool,
    pub block_number: u64,
}

/// Settlement-chain transaction correlated to a commitment by hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementTransaction {
    /// Canonical `0x`-prefixed hash.
    pub hash: TxHash,
    /// Epoch milliseconds.
    pub timestamp_ms: u64,
    /// Builder identifier advertised in the block's extra data.
    pub extra_data: String,
    pub block_number: u64,
}

/// A protocol event of any kind, as returned by an event source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ProtocolEvent {
    Encrypted(EncryptedCommitment),
    Opened(OpenedCommitment),
    Processed(CommitmentProcessed),
}

impl ProtocolEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ProtocolEvent::Encrypted(_) => EventKind::EncryptedCommitment,
            ProtocolEvent::Opened(_) => EventKind::OpenedCommitment,
            ProtocolEvent::Processed(_) => EventKind::CommitmentProcessed,
        }
    }

    pub fn commitment_index(&self) -> CommitmentIndex {
        match self {
            ProtocolEvent::Encrypted(e) => e.commitment_index,
            ProtocolEvent::Opened(e) => e.commitment_index,
            ProtocolEvent::Processed(e) => e.commitment_index,
        }
    }

    pub fn block_number(&self) -> u64 {
        match self {
            ProtocolEvent::Encrypted(e) => e.block_number,
            ProtocolEvent::Opened(e) => e.block_number,
            ProtocolEvent::Processed(e) => e.block_number,
        }
    }
}
