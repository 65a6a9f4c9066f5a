//! Error types for partiflow
//!
//! This module defines the error hierarchy for the entire crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.

use thiserror::Error;

/// The main error type for partiflow
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // State Errors
    // ============================================================================
    #[error("State error: {message}")]
    State { message: String },

    #[error("Cannot convert state value: {message}")]
    StateConversion { message: String },

    // ============================================================================
    // Cursor Errors
    // ============================================================================
    #[error("Cursor error for stream '{stream}': {message}")]
    Cursor { stream: String, message: String },

    #[error("Partition is expected to have key `{key}` but could not be found")]
    MissingSliceBoundary { key: String },

    // ============================================================================
    // Partition / Orchestration Errors
    // ============================================================================
    #[error("Error reading partition of stream '{stream}': {display_message}")]
    PartitionRead {
        stream: String,
        display_message: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Stream '{stream}' is unavailable{}", .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
    Unavailable {
        stream: String,
        message: Option<String>,
    },

    #[error("Sync of stream '{stream}' is incomplete: {failed_partitions} partition(s) failed; first error: {first_error}")]
    StreamIncomplete {
        stream: String,
        failed_partitions: usize,
        #[source]
        first_error: Box<Error>,
    },

    #[error("Partition generation failed for stream '{stream}': {message}")]
    PartitionGeneration { stream: String, message: String },

    #[error("Worker task for stream '{stream}' panicked: {message}")]
    WorkerPanicked { stream: String, message: String },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid config value error
    pub fn invalid_config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a state error
    pub fn state(message: impl Into<String>) -> Self {
        Self::State {
            message: message.into(),
        }
    }

    /// Create a state conversion error
    pub fn conversion(message: impl Into<String>) -> Self {
        Self::StateConversion {
            message: message.into(),
        }
    }

    /// Create a cursor error
    pub fn cursor(stream: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Cursor {
            stream: stream.into(),
            message: message.into(),
        }
    }

    /// Create a missing slice boundary error
    pub fn missing_boundary(key: impl Into<String>) -> Self {
        Self::MissingSliceBoundary { key: key.into() }
    }

    /// Wrap an error raised while reading a partition with a user-facing message
    pub fn partition_read(
        stream: impl Into<String>,
        display_message: impl Into<String>,
        source: Error,
    ) -> Self {
        Self::PartitionRead {
            stream: stream.into(),
            display_message: display_message.into(),
            source: Box::new(source),
        }
    }

    /// Create an unavailable stream error
    pub fn unavailable(stream: impl Into<String>, message: Option<String>) -> Self {
        Self::Unavailable {
            stream: stream.into(),
            message,
        }
    }

    /// Create an incomplete sync error
    pub fn incomplete(stream: impl Into<String>, failed_partitions: usize, first_error: Error) -> Self {
        Self::StreamIncomplete {
            stream: stream.into(),
            failed_partitions,
            first_error: Box::new(first_error),
        }
    }

    /// User-facing message, if the error carries one
    pub fn display_message(&self) -> Option<&str> {
        match self {
            Error::PartitionRead {
                display_message, ..
            } => Some(display_message),
            Error::StreamIncomplete { first_error, .. } => first_error.display_message(),
            Error::Unavailable { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    /// Whether this error marks the stream's sync as incomplete rather than
    /// aborting it before any work was scheduled
    pub fn is_incomplete_sync(&self) -> bool {
        matches!(self, Error::StreamIncomplete { .. })
    }
}

/// Result type alias for partiflow
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}
