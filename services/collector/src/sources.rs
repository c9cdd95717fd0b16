//! Pluggable data sources
//!
//! The collectors treat both upstreams as opaque pull-based fetchers that
//! return a finite batch per call. Whether a source applies the
//! `from_block` cursor or re-returns known history is its own business;
//! the store's idempotent puts absorb any overlap.

use async_trait::async_trait;
use thiserror::Error;
use types::events::{EventKind, ProtocolEvent, SettlementTransaction};
use types::ids::TxHash;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed payload: {0}")]
    Malformed(String),
}

/// Pull-based source of protocol events.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Fetch currently-available events of `kind` observed at or after
    /// `from_block`.
    async fn fetch_events(
        &self,
        kind: EventKind,
        from_block: u64,
    ) -> Result<Vec<ProtocolEvent>, SourceError>;
}

/// Pull-based source of settlement-chain transaction metadata.
#[async_trait]
pub trait SettlementSource: Send + Sync {
    /// Resolve metadata for the given hashes. Unknown hashes are simply
    /// absent from the result, not errors.
    async fn fetch_transactions(
        &self,
        hashes: &[TxHash],
    ) -> Result<Vec<SettlementTransaction>, SourceError>;
}
