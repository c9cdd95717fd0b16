//! Time-Series Store
//!
//! Durable table set for protocol events and settlement transactions, with
//! idempotent natural-key insertion, an append-only journal for crash
//! recovery, the read queries the derived views are computed from, and the
//! registry hosting the materialized view objects.
//!
//! All coordination between the collectors and the refresher happens
//! through this store; none of them call each other directly.

pub mod error;
pub mod journal;
pub mod tables;
pub mod store;
pub mod registry;

pub use error::StoreError;
pub use registry::{
    EnsureOutcome, ReadOnlyViews, RegistryError, ViewData, ViewName, ViewRegistry, READ_ROLE,
};
pub use store::{CorrelatedCommitment, TableCounts, TimeSeriesStore};
pub use tables::PutOutcome;
