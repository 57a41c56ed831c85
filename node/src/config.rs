//! Node configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use slpdb_graph::PruningConfig;

use crate::logging::LogFormat;
use crate::NodeError;

/// Configuration for the token graph runtime.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Number of recent chain tips a block must fall behind before its
    /// settled transactions are evicted from memory.
    #[serde(default = "default_prune_window")]
    pub prune_window: usize,

    /// How many recent chain tips are tracked.
    #[serde(default = "default_recent_blocks_capacity")]
    pub recent_blocks_capacity: usize,

    /// Poll interval while an enqueue waits for a token bootstrap, in ms.
    #[serde(default = "default_bootstrap_poll_ms")]
    pub bootstrap_poll_ms: u64,

    /// Poll interval while shutdown waits for a debounce cycle, in ms.
    #[serde(default = "default_shutdown_poll_ms")]
    pub shutdown_poll_ms: u64,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Whether Prometheus metrics are collected.
    #[serde(default)]
    pub enable_metrics: bool,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_prune_window() -> usize {
    10
}

fn default_recent_blocks_capacity() -> usize {
    10
}

fn default_bootstrap_poll_ms() -> u64 {
    250
}

fn default_shutdown_poll_ms() -> u64 {
    500
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, NodeError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| NodeError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        let config: Self = toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// The tip tracker must hold at least one full pruning window.
    pub fn validate(&self) -> Result<(), NodeError> {
        if self.prune_window == 0 {
            return Err(NodeError::Config("prune_window must be at least 1".into()));
        }
        if self.recent_blocks_capacity < self.prune_window {
            return Err(NodeError::Config(format!(
                "recent_blocks_capacity ({}) is smaller than prune_window ({})",
                self.recent_blocks_capacity, self.prune_window
            )));
        }
        Ok(())
    }

    pub fn pruning(&self) -> PruningConfig {
        PruningConfig {
            window: self.prune_window,
        }
    }

    pub fn bootstrap_poll(&self) -> Duration {
        Duration::from_millis(self.bootstrap_poll_ms)
    }

    pub fn shutdown_poll(&self) -> Duration {
        Duration::from_millis(self.shutdown_poll_ms)
    }

    pub fn log_format(&self) -> LogFormat {
        LogFormat::from_name(&self.log_format)
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            prune_window: default_prune_window(),
            recent_blocks_capacity: default_recent_blocks_capacity(),
            bootstrap_poll_ms: default_bootstrap_poll_ms(),
            shutdown_poll_ms: default_shutdown_poll_ms(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            enable_metrics: false,
        }
    }
}
