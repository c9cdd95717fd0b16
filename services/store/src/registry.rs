//! Materialized view registry
//!
//! Hosts the backing objects for the derived views. Creation ("the view
//! exists, possibly with no data") and freshness ("the view holds the
//! rows of some refresh instant") are separate operations: `ensure` is
//! idempotent create-if-absent plus the read-role grant, `install`
//! atomically swaps in a freshly computed result. Readers go through
//! [`ReadOnlyViews`], which refuses access unless the read role was
//! granted at creation time.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;
use tracing::info;
use types::views::{PreconfTxRow, TotalPreconfStats};

/// The read-only principal the external query gateway connects as.
pub const READ_ROLE: &str = "view_reader";

// ── Errors ──────────────────────────────────────────────────────────

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("view {view} exists but role {role} has no select grant")]
    PermissionDenied { view: ViewName, role: String },

    #[error("view {0} has not been created")]
    ViewMissing(ViewName),

    #[error("Registry lock poisoned")]
    LockPoisoned,
}

// ── Names & data ────────────────────────────────────────────────────

/// The declared view set, in refresh order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ViewName {
    PreconfTxs,
    TotalPreconfStats,
}

impl ViewName {
    /// All views in their declared refresh order.
    pub fn all() -> &'static [ViewName] {
        &[ViewName::PreconfTxs, ViewName::TotalPreconfStats]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ViewName::PreconfTxs => "preconf_txs",
            ViewName::TotalPreconfStats => "total_preconf_stats",
        }
    }
}

impl std::fmt::Display for ViewName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully computed view result, swapped in whole on refresh.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewData {
    PreconfTxs(Vec<PreconfTxRow>),
    TotalPreconfStats(TotalPreconfStats),
}

impl ViewData {
    pub fn name(&self) -> ViewName {
        match self {
            ViewData::PreconfTxs(_) => ViewName::PreconfTxs,
            ViewData::TotalPreconfStats(_) => ViewName::TotalPreconfStats,
        }
    }

    pub fn row_count(&self) -> usize {
        match self {
            ViewData::PreconfTxs(rows) => rows.len(),
            // The aggregate is a singleton row.
            ViewData::TotalPreconfStats(_) => 1,
        }
    }
}

/// Outcome of an idempotent `ensure` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureOutcome {
    Created,
    AlreadyExists,
}

// ── Registry ────────────────────────────────────────────────────────

struct ViewState {
    /// `None` until the first refresh completes (created "with no data").
    data: Option<ViewData>,
    refreshed_at_ms: Option<u64>,
    grants: BTreeSet<String>,
}

/// Registry of materialized view objects hosted by the store.
pub struct ViewRegistry {
    inner: RwLock<BTreeMap<ViewName, ViewState>>,
}

impl ViewRegistry {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn exists(&self, view: ViewName) -> Result<bool, RegistryError> {
        let inner = self.inner.read().map_err(|_| RegistryError::LockPoisoned)?;
        Ok(inner.contains_key(&view))
    }

    /// Create the view if absent and grant the read role. Re-running when
    /// the view already exists changes nothing, including its rows.
    pub fn ensure(&self, view: ViewName) -> Result<EnsureOutcome, RegistryError> {
        let mut inner = self.inner.write().map_err(|_| RegistryError::LockPoisoned)?;
        if inner.contains_key(&view) {
            return Ok(EnsureOutcome::AlreadyExists);
        }
        let mut grants = BTreeSet::new();
        grants.insert(READ_ROLE.to_string());
        inner.insert(
            view,
            ViewState {
                data: None,
                refreshed_at_ms: None,
                grants,
            },
        );
        info!(view = %view, role = READ_ROLE, "materialized view created, read role granted");
        Ok(EnsureOutcome::Created)
    }

    /// Atomically replace the view's contents with a freshly computed
    /// result. The swap is all-or-nothing; readers never see a partially
    /// refreshed view.
    pub fn install(&self, data: ViewData) -> Result<(), RegistryError> {
        let view = data.name();
        let mut inner = self.inner.write().map_err(|_| RegistryError::LockPoisoned)?;
        let state = inner.get_mut(&view).ok_or(RegistryError::ViewMissing(view))?;
        state.data = Some(data);
        state.refreshed_at_ms = Some(epoch_ms());
        Ok(())
    }

    /// Row count of the view's current contents; `None` while the view is
    /// absent or holds no data yet.
    pub fn row_count(&self, view: ViewName) -> Result<Option<usize>, RegistryError> {
        let inner = self.inner.read().map_err(|_| RegistryError::LockPoisoned)?;
        Ok(inner
            .get(&view)
            .and_then(|state| state.data.as_ref())
            .map(ViewData::row_count))
    }

    pub fn refreshed_at_ms(&self, view: ViewName) -> Result<Option<u64>, RegistryError> {
        let inner = self.inner.read().map_err(|_| RegistryError::LockPoisoned)?;
        Ok(inner.get(&view).and_then(|state| state.refreshed_at_ms))
    }

    /// Read handle for a principal. Access checks happen per read against
    /// the grants recorded when each view was created.
    pub fn read_only<'a>(&'a self, role: &str) -> ReadOnlyViews<'a> {
        ReadOnlyViews {
            registry: self,
            role: role.to_string(),
        }
    }

    fn read_data(&self, view: ViewName, role: &str) -> Result<Option<ViewData>, RegistryError> {
        let inner = self.inner.read().map_err(|_| RegistryError::LockPoisoned)?;
        match inner.get(&view) {
            // Absence is a valid, observable state, not an error.
            None => Ok(None),
            Some(state) => {
                if !state.grants.contains(role) {
                    return Err(RegistryError::PermissionDenied {
                        view,
                        role: role.to_string(),
                    });
                }
                Ok(state.data.clone())
            }
        }
    }
}

impl Default for ViewRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// ── Read handle ─────────────────────────────────────────────────────

/// Select-only access to the derived views for a named principal.
///
/// This is the surface the external query gateway consumes; it exposes no
/// write operations.
pub struct ReadOnlyViews<'a> {
    registry: &'a ViewRegistry,
    role: String,
}

impl ReadOnlyViews<'_> {
    pub fn preconf_txs(&self) -> Result<Option<Vec<PreconfTxRow>>, RegistryError> {
        match self.registry.read_data(ViewName::PreconfTxs, &self.role)? {
            Some(ViewData::PreconfTxs(rows)) => Ok(Some(rows)),
            _ => Ok(None),
        }
    }

    pub fn total_preconf_stats(&self) -> Result<Option<TotalPreconfStats>, RegistryError> {
        match self
            .registry
            .read_data(ViewName::TotalPreconfStats, &self.role)?
        {
            Some(ViewData::TotalPreconfStats(stats)) => Ok(Some(stats)),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn stats() -> TotalPreconfStats {
        TotalPreconfStats {
            total_commitments: 2,
            bidder_count: 1,
            total_decayed_bid_eth: Decimal::from(3),
            avg_decayed_bid_eth: Decimal::new(15, 1),
            max_decayed_bid_eth: Decimal::from(2),
            min_decayed_bid_eth: Decimal::ONE,
        }
    }

    #[test]
    fn test_ensure_is_idempotent() {
        let registry = ViewRegistry::new();
        assert_eq!(
            registry.ensure(ViewName::PreconfTxs).unwrap(),
            EnsureOutcome::Created
        );
        registry.install(ViewData::PreconfTxs(Vec::new())).unwrap();
        let before = registry.row_count(ViewName::PreconfTxs).unwrap();

        // Second ensure is a no-op and leaves row counts unchanged.
        assert_eq!(
            registry.ensure(ViewName::PreconfTxs).unwrap(),
            EnsureOutcome::AlreadyExists
        );
        assert_eq!(registry.row_count(ViewName::PreconfTxs).unwrap(), before);
    }

    #[test]
    fn test_install_requires_created_view() {
        let registry = ViewRegistry::new();
        let err = registry
            .install(ViewData::TotalPreconfStats(stats()))
            .unwrap_err();
        assert_eq!(err, RegistryError::ViewMissing(ViewName::TotalPreconfStats));
    }

    #[test]
    fn test_absent_view_reads_as_none() {
        let registry = ViewRegistry::new();
        let reader = registry.read_only(READ_ROLE);
        assert_eq!(reader.preconf_txs().unwrap(), None);
        assert_eq!(reader.total_preconf_stats().unwrap(), None);
    }

    #[test]
    fn test_created_but_unrefreshed_reads_as_none() {
        let registry = ViewRegistry::new();
        registry.ensure(ViewName::TotalPreconfStats).unwrap();
        let reader = registry.read_only(READ_ROLE);
        assert_eq!(reader.total_preconf_stats().unwrap(), None);
    }

    #[test]
    fn test_read_role_granted_on_creation() {
        let registry = ViewRegistry::new();
        registry.ensure(ViewName::TotalPreconfStats).unwrap();
        registry
            .install(ViewData::TotalPreconfStats(stats()))
            .unwrap();

        let reader = registry.read_only(READ_ROLE);
        assert_eq!(reader.total_preconf_stats().unwrap(), Some(stats()));
    }

    #[test]
    fn test_ungranted_role_denied() {
        let registry = ViewRegistry::new();
        registry.ensure(ViewName::PreconfTxs).unwrap();
        registry.install(ViewData::PreconfTxs(Vec::new())).unwrap();

        let reader = registry.read_only("intruder");
        assert!(matches!(
            reader.preconf_txs().unwrap_err(),
            RegistryError::PermissionDenied { .. }
        ));
    }

    #[test]
    fn test_install_swaps_whole_result() {
        let registry = ViewRegistry::new();
        registry.ensure(ViewName::TotalPreconfStats).unwrap();
        registry
            .install(ViewData::TotalPreconfStats(stats()))
            .unwrap();

        let mut newer = stats();
        newer.total_commitments = 5;
        registry
            .install(ViewData::TotalPreconfStats(newer.clone()))
            .unwrap();

        let reader = registry.read_only(READ_ROLE);
        assert_eq!(reader.total_preconf_stats().unwrap(), Some(newer));
        assert!(registry
            .refreshed_at_ms(ViewName::TotalPreconfStats)
            .unwrap()
            .is_some());
    }
}
