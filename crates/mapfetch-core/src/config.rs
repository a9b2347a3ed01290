//! Orchestrator configuration.
//!
//! Plain serde types with defaults; hosts may load them from JSON.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default minimum interval between progress events for one node.
pub const DEFAULT_PROGRESS_INTERVAL_MS: u64 = 100;

/// Default capacity of the service command channel.
pub const DEFAULT_COMMAND_BUFFER: usize = 64;

/// Errors from loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Command buffer must be between 1 and 4096, got {0}")]
    InvalidCommandBuffer(usize),

    #[error("Progress interval must be at most 10000 ms, got {0}")]
    InvalidProgressInterval(u64),

    #[error("Failed to read config {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("Failed to parse config: {0}")]
    Parse(String),
}

/// Tunables of the orchestrator and its service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Minimum milliseconds between progress events for one node. The
    /// first and the final update are never suppressed. Zero disables
    /// throttling.
    pub progress_interval_ms: u64,

    /// Publish an event for each ancestor after every leaf event.
    pub hierarchy_events: bool,

    /// Write the queue through the repository after every change.
    pub persist_queue: bool,

    /// Capacity of the service command channel.
    pub command_buffer: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            progress_interval_ms: DEFAULT_PROGRESS_INTERVAL_MS,
            hierarchy_events: true,
            persist_queue: true,
            command_buffer: DEFAULT_COMMAND_BUFFER,
        }
    }
}

impl OrchestratorConfig {
    /// Set the progress throttle interval.
    #[must_use]
    pub const fn with_progress_interval_ms(mut self, ms: u64) -> Self {
        self.progress_interval_ms = ms;
        self
    }

    /// Enable or disable ancestor events.
    #[must_use]
    pub const fn with_hierarchy_events(mut self, enabled: bool) -> Self {
        self.hierarchy_events = enabled;
        self
    }

    /// Enable or disable queue persistence.
    #[must_use]
    pub const fn with_persist_queue(mut self, enabled: bool) -> Self {
        self.persist_queue = enabled;
        self
    }

    /// Set the command channel capacity.
    #[must_use]
    pub const fn with_command_buffer(mut self, size: usize) -> Self {
        self.command_buffer = size;
        self
    }

    /// Throttle interval as a `Duration`.
    #[must_use]
    pub const fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=4096).contains(&self.command_buffer) {
            return Err(ConfigError::InvalidCommandBuffer(self.command_buffer));
        }
        if self.progress_interval_ms > 10_000 {
            return Err(ConfigError::InvalidProgressInterval(
                self.progress_interval_ms,
            ));
        }
        Ok(())
    }

    /// Load and validate a JSON config file. Missing fields take defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let config: Self =
            serde_json::from_str(&json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}
