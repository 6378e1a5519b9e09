//! Engine and logging configuration.
//!
//! Every field has a serde default so a partial (or empty) TOML file is a
//! valid configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Runtime configuration for the buff service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Wall-clock spacing between expiration checks of a single buff
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Capacity of the inbound signal channel
    #[serde(default = "default_signal_capacity")]
    pub signal_capacity: usize,

    /// World clock reading at service start (logical seconds)
    #[serde(default)]
    pub world_time_offset: i64,

    /// Directory with builtin buff definitions (shipped with the server)
    #[serde(default)]
    pub builtin_definitions: Option<PathBuf>,

    /// Directory with operator definitions (override builtins by name)
    #[serde(default)]
    pub custom_definitions: Option<PathBuf>,

    #[serde(default)]
    pub log: LogConfig,
}

impl EngineConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            signal_capacity: default_signal_capacity(),
            world_time_offset: 0,
            builtin_definitions: None,
            custom_definitions: None,
            log: LogConfig::default(),
        }
    }
}

/// Logging setup consumed by binaries when installing a subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Default `EnvFilter` directive (`RUST_LOG` wins when set)
    #[serde(default = "default_log_filter")]
    pub filter: String,

    /// Append logs to this file instead of stderr
    #[serde(default)]
    pub file: Option<PathBuf>,

    #[serde(default = "default_true")]
    pub ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            file: None,
            ansi: true,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Serde Helpers
// ═══════════════════════════════════════════════════════════════════════════

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_signal_capacity() -> usize {
    256
}

fn default_log_filter() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}
