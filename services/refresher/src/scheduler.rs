//! Refresh scheduler
//!
//! Explicit state machine driving the view backend:
//!
//! ```text
//! WaitForStoreReady → EnsureViewsExist → RefreshEachView → Sleep
//!                            ▲                                │
//!                            └────────────────────────────────┘
//! ```
//!
//! The readiness wait happens once, at process start, polling the store's
//! liveness probe on a short fixed interval. After that, every cycle
//! ensures each declared view exists and refreshes each one in declared
//! order; a failure on one view is logged and neither stops the remaining
//! views in the cycle nor the next cycle's attempt. The loop only
//! terminates on an external shutdown request, draining the in-flight
//! cycle first.

use std::time::Duration;

use timeseries_store::{EnsureOutcome, ViewName};
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::error::RefreshError;

/// Named scheduler states, observable for tests and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    WaitForStoreReady,
    EnsureViewsExist,
    RefreshEachView,
    Sleep,
}

/// The operations the scheduler drives. Implemented by
/// `MaterializedViewManager`; mocked in tests.
pub trait ViewBackend: Send + Sync {
    /// Store liveness probe.
    fn ping(&self) -> Result<(), RefreshError>;
    /// Idempotent create-if-absent.
    fn ensure_exists(&self, view: ViewName) -> Result<EnsureOutcome, RefreshError>;
    /// Wholesale recomputation; returns the installed row count.
    fn refresh(&self, view: ViewName) -> Result<usize, RefreshError>;
}

/// Outcome of one ensure+refresh cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleOutcome {
    pub refreshed: Vec<ViewName>,
    pub failed: Vec<ViewName>,
}

/// Default readiness poll interval at process start.
pub const READY_POLL_INTERVAL: Duration = Duration::from_secs(2);
/// Default sleep between full refresh cycles.
pub const CYCLE_INTERVAL: Duration = Duration::from_secs(60);

/// Drives view existence and freshness on a fixed cadence.
pub struct RefreshScheduler<B> {
    backend: B,
    views: Vec<ViewName>,
    ready_poll: Duration,
    cycle_interval: Duration,
    state: SchedulerState,
}

impl<B: ViewBackend> RefreshScheduler<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            views: ViewName::all().to_vec(),
            ready_poll: READY_POLL_INTERVAL,
            cycle_interval: CYCLE_INTERVAL,
            state: SchedulerState::WaitForStoreReady,
        }
    }

    pub fn with_intervals(mut self, ready_poll: Duration, cycle_interval: Duration) -> Self {
        self.ready_poll = ready_poll;
        self.cycle_interval = cycle_interval;
        self
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Block until the store answers its liveness probe, polling on the
    /// fixed interval. Returns false if shutdown was requested first.
    /// Runs once, at process start only.
    pub async fn wait_for_store_ready(&mut self, shutdown: &mut watch::Receiver<bool>) -> bool {
        self.state = SchedulerState::WaitForStoreReady;
        loop {
            if *shutdown.borrow() {
                return false;
            }
            match self.backend.ping() {
                Ok(()) => {
                    info!("store ready");
                    return true;
                }
                Err(e) => {
                    warn!(error = %e, "store not ready, polling again");
                }
            }
            tokio::select! {
                _ = tokio::time::sleep(self.ready_poll) => {}
                _ = shutdown.changed() => {}
            }
        }
    }

    /// One full ensure+refresh pass over the declared views, with
    /// per-view failure isolation.
    pub fn run_cycle(&mut self) -> CycleOutcome {
        let mut outcome = CycleOutcome::default();

        self.state = SchedulerState::EnsureViewsExist;
        for &view in &self.views {
            if let Err(e) = self.backend.ensure_exists(view) {
                error!(view = %view, error = %e, "ensure failed");
            }
        }

        self.state = SchedulerState::RefreshEachView;
        for &view in &self.views {
            match self.backend.refresh(view) {
                Ok(rows) => {
                    info!(view = %view, rows, "view refreshed");
                    outcome.refreshed.push(view);
                }
                Err(e) => {
                    error!(view = %view, error = %e, "refresh failed, retrying next cycle");
                    outcome.failed.push(view);
                }
            }
        }

        outcome
    }

    /// Run forever: readiness wait once, then ensure+refresh cycles until
    /// an external termination request arrives.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            cycle_secs = self.cycle_interval.as_secs(),
            views = self.views.len(),
            "refresh scheduler started"
        );
        if !self.wait_for_store_ready(&mut shutdown).await {
            info!("refresh scheduler stopped before store became ready");
            return;
        }

        loop {
            if *shutdown.borrow() {
                break;
            }
            self.run_cycle();
            self.state = SchedulerState::Sleep;
            tokio::select! {
                _ = tokio::time::sleep(self.cycle_interval) => {}
                _ = shutdown.changed() => {}
            }
            if *shutdown.borrow() {
                break;
            }
        }
        info!("refresh scheduler stopped");
    }
}
