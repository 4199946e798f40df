//! Shared configuration types for Elite Monitor.
//!
//! These are plain serde structs so the CLI (and any future front end) can
//! load them from disk without pulling in the watcher runtime.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default seconds between a carrier's scheduled departure and the end of
/// its post-jump cooldown.
pub const DEFAULT_JUMP_COOLDOWN_SECS: i64 = 290;

/// Default seconds after an observed arrival when no departure was seen.
pub const DEFAULT_FALLBACK_COOLDOWN_SECS: i64 = 230;

/// Default interval for the read poll that backs up filesystem notifications.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Top-level monitor configuration, usually loaded from `config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Directory containing `Journal.*.log` files.
    pub journal_directory: PathBuf,

    /// Commanders to demultiplex in `monitor` mode.
    #[serde(default)]
    pub commanders: Option<Vec<String>>,

    #[serde(default)]
    pub pushover: Option<PushoverConfig>,

    #[serde(default)]
    pub carrier: CarrierTimings,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl MonitorConfig {
    pub fn new(journal_directory: impl Into<PathBuf>) -> Self {
        Self {
            journal_directory: journal_directory.into(),
            commanders: None,
            pushover: None,
            carrier: CarrierTimings::default(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

/// Credentials for the Pushover notification service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushoverConfig {
    pub api_key: String,
    pub user_key: String,
}

/// Empirically calibrated carrier timing constants.
///
/// Observed game revisions disagree on these (300s, 290s, arrival + 230s),
/// so they are configuration rather than protocol constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CarrierTimings {
    /// Cooldown end measured from the scheduled departure time.
    pub jump_cooldown_secs: i64,
    /// Cooldown end measured from an arrival with no known departure.
    pub fallback_cooldown_secs: i64,
}

impl Default for CarrierTimings {
    fn default() -> Self {
        Self {
            jump_cooldown_secs: DEFAULT_JUMP_COOLDOWN_SECS,
            fallback_cooldown_secs: DEFAULT_FALLBACK_COOLDOWN_SECS,
        }
    }
}
