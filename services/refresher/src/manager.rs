//! Materialized view manager
//!
//! Defines existence, not freshness: `ensure_exists` creates a view's
//! backing object (and the read-role grant) the first time it is observed
//! to be absent, and is a no-op on every later call. `refresh` recomputes
//! a view's definition and atomically installs the result. The scheduler
//! is free to call both every cycle.

use std::sync::Arc;

use timeseries_store::{EnsureOutcome, TimeSeriesStore, ViewName};
use tracing::info;

use crate::definitions::definition;
use crate::error::RefreshError;
use crate::scheduler::ViewBackend;

pub struct MaterializedViewManager {
    store: Arc<TimeSeriesStore>,
}

impl MaterializedViewManager {
    pub fn new(store: Arc<TimeSeriesStore>) -> Self {
        Self { store }
    }

    /// Create the view's backing object if absent, granting the read role.
    /// Safe to run on every cycle.
    pub fn ensure_exists(&self, view: ViewName) -> Result<EnsureOutcome, RefreshError> {
        Ok(self.store.views().ensure(view)?)
    }

    /// Recompute the view wholesale and swap the result in. Returns the
    /// installed row count.
    pub fn refresh(&self, view: ViewName) -> Result<usize, RefreshError> {
        let data = definition(view).compute(&self.store)?;
        let rows = data.row_count();
        self.store.views().install(data)?;
        info!(view = %view, rows, "materialized view refreshed");
        Ok(rows)
    }
}

impl ViewBackend for MaterializedViewManager {
    fn ping(&self) -> Result<(), RefreshError> {
        Ok(self.store.ping()?)
    }

    fn ensure_exists(&self, view: ViewName) -> Result<EnsureOutcome, RefreshError> {
        MaterializedViewManager::ensure_exists(self, view)
    }

    fn refresh(&self, view: ViewName) -> Result<usize, RefreshError> {
        MaterializedViewManager::refresh(self, view)
    }
}
