//! Event Collector Service
//!
//! Two long-running, independent collection loops that only ever write to
//! the time-series store:
//!
//! - `EventCollector` pulls protocol events (encrypted, opened, processed
//!   commitment stages) on a fixed cadence, per-kind failure isolated.
//! - `SettlementTxFetcher` resolves settlement-chain transactions for the
//!   hashes referenced by stored opened commitments.
//!
//! Both rely on the store's natural-key idempotency to be safely re-run
//! after crashes; the block-number cursor only trims redundant fetching.

pub mod config;
pub mod sources;
pub mod http;
pub mod collector;
pub mod fetcher;

pub use collector::EventCollector;
pub use fetcher::SettlementTxFetcher;
pub use sources::{EventSource, SettlementSource, SourceError};
