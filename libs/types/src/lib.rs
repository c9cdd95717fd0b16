//! Types library for the commitment analytics pipeline
//!
//! This library provides all core type definitions shared by the collectors,
//! the time-series store, and the view refresher.
//!
//! # Modules
//! - `ids`: Natural-key identifiers (CommitmentIndex, TxHash)
//! - `events`: Protocol event records and settlement transactions
//! - `decay`: Decay-weighted bid valuation math
//! - `views`: Derived view row shapes consumed by the read-only gateway

pub mod ids;
pub mod events;
pub mod decay;
pub mod views;

// Library version constant
pub const LIB_VERSION: &str = "0.1.0";

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::ids::*;
    pub use crate::events::*;
    pub use crate::decay::*;
    pub use crate::views::*;
}
