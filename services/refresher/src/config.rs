//! Refresher process configuration

use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RefresherConfig {
    /// Directory holding the store journal.
    pub data_dir: PathBuf,
    /// Readiness poll interval at boot.
    pub ready_poll: Duration,
    /// Sleep between full refresh cycles.
    pub cycle_interval: Duration,
}

impl RefresherConfig {
    /// Build from environment variables, falling back to defaults.
    ///
    /// - `PIPELINE_DATA_DIR` (default `./data`)
    /// - `READY_POLL_SECS` (default 2)
    /// - `REFRESH_INTERVAL_SECS` (default 60)
    pub fn from_env() -> Self {
        Self {
            data_dir: PathBuf::from(
                std::env::var("PIPELINE_DATA_DIR").unwrap_or_else(|_| "./data".to_string()),
            ),
            ready_poll: Duration::from_secs(env_secs("READY_POLL_SECS", 2)),
            cycle_interval: Duration::from_secs(env_secs("REFRESH_INTERVAL_SECS", 60)),
        }
    }
}

fn env_secs(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
