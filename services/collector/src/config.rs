//! Collector process configuration
//!
//! All settings come from the environment with documented defaults; the
//! two fetch intervals default to the 30 second protocol cadence.

use std::path::PathBuf;
use std::time::Duration;

/// Default cadence for both collection loops.
pub const DEFAULT_INTERVAL_SECS: u64 = 30;
/// Bounded per-request timeout for the HTTP sources.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Directory holding the store journal.
    pub data_dir: PathBuf,
    /// Base URL of the protocol event source.
    pub event_source_url: String,
    /// Base URL of the settlement-chain source.
    pub settlement_source_url: String,
    /// Sleep between protocol event cycles.
    pub event_interval: Duration,
    /// Sleep between settlement fetch cycles.
    pub settlement_interval: Duration,
    /// Per-request timeout applied by the HTTP sources.
    pub request_timeout: Duration,
}

impl CollectorConfig {
    /// Build from environment variables, falling back to defaults.
    ///
    /// - `PIPELINE_DATA_DIR` (default `./data`)
    /// - `EVENT_SOURCE_URL` (default `http://localhost:8545`)
    /// - `SETTLEMENT_SOURCE_URL` (default `http://localhost:8546`)
    /// - `EVENT_INTERVAL_SECS`, `SETTLEMENT_INTERVAL_SECS` (default 30)
    /// - `REQUEST_TIMEOUT_SECS` (default 10)
    pub fn from_env() -> Self {
        Self {
            data_dir: PathBuf::from(env_or("PIPELINE_DATA_DIR", "./data")),
            event_source_url: env_or("EVENT_SOURCE_URL", "http://localhost:8545"),
            settlement_source_url: env_or("SETTLEMENT_SOURCE_URL", "http://localhost:8546"),
            event_interval: Duration::from_secs(env_secs(
                "EVENT_INTERVAL_SECS",
                DEFAULT_INTERVAL_SECS,
            )),
            settlement_interval: Duration::from_secs(env_secs(
                "SETTLEMENT_INTERVAL_SECS",
                DEFAULT_INTERVAL_SECS,
            )),
            request_timeout: Duration::from_secs(env_secs(
                "REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_secs(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
