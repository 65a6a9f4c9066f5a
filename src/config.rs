//! Configuration for concurrent reads
//!
//! Loadable from YAML or JSON; every field has a default so an empty
//! document is a valid configuration.

use crate::error::{Error, Result, ResultExt};
use serde::{Deserialize, Serialize};
use std::path::Path;

// ============================================================================
// Concurrency Config
// ============================================================================

/// Settings for the partitioned read engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConcurrencyConfig {
    /// Maximum number of partitions read at the same time
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Capacity of the queue between workers and the record consumer
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Emit one log message per scheduled partition
    #[serde(default)]
    pub log_slices: bool,
}

fn default_max_workers() -> usize {
    10
}

fn default_queue_capacity() -> usize {
    10_000
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            queue_capacity: default_queue_capacity(),
            log_slices: false,
        }
    }
}

impl ConcurrencyConfig {
    /// Create a config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the worker pool size
    #[must_use]
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }

    /// Set the queue capacity
    #[must_use]
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Enable or disable slice logging
    #[must_use]
    pub fn with_slice_logging(mut self, log_slices: bool) -> Self {
        self.log_slices = log_slices;
        self
    }

    /// Parse and validate a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a JSON document
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a `.yaml`/`.yml` or `.json` file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&contents),
            _ => Self::from_yaml_str(&contents),
        }
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.max_workers == 0 {
            return Err(Error::invalid_config(
                "max_workers",
                "must be at least 1",
            ));
        }
        if self.queue_capacity == 0 {
            return Err(Error::invalid_config(
                "queue_capacity",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}
