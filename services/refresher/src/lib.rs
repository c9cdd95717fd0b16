//! View Refresher Service
//!
//! Owns everything about the derived views: their definitions (the
//! aggregate queries over the time-series store), the manager that makes
//! sure each view's backing object exists, and the scheduler that
//! periodically recomputes them with per-view failure isolation.
//!
//! Existence and freshness are deliberately separate responsibilities:
//! `MaterializedViewManager::ensure_exists` is safe to call every cycle,
//! while `refresh` swaps in a wholesale recomputation.

pub mod config;
pub mod error;
pub mod definitions;
pub mod manager;
pub mod scheduler;

pub use error::RefreshError;
pub use manager::MaterializedViewManager;
pub use scheduler::{RefreshScheduler, SchedulerState, ViewBackend};
