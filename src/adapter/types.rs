//! Legacy stream contract

use crate::error::{Error, Result};
use crate::types::{JsonObject, JsonValue, LogLevel, SyncMode};
use async_trait::async_trait;
use futures::Stream;
use std::fmt;
use std::pin::Pin;

/// Item yielded by a legacy stream while reading one slice
#[derive(Debug, Clone, PartialEq)]
pub enum StreamData {
    /// A record payload
    Record(JsonObject),
    /// A log line meant for the platform, not for the record output
    Log {
        /// Log level
        level: LogLevel,
        /// Log message
        message: String,
    },
}

impl StreamData {
    /// Create a record item
    pub fn record(data: JsonObject) -> Self {
        Self::Record(data)
    }

    /// Create a log item
    pub fn log(level: LogLevel, message: impl Into<String>) -> Self {
        Self::Log {
            level,
            message: message.into(),
        }
    }
}

/// Stream of items read from one slice of a legacy stream
pub type StreamDataStream = Pin<Box<dyn Stream<Item = Result<StreamData>> + Send>>;

/// Lazily produced slices of a legacy stream. `None` stands for the whole stream.
pub type SliceStream = Pin<Box<dyn Stream<Item = Result<Option<JsonObject>>> + Send>>;

/// A single-threaded, slice-based stream.
///
/// This is the contract connectors implemented before partitioned reads
/// existed: list the slices, then read each slice in turn.
#[async_trait]
pub trait LegacyStream: Send + Sync + fmt::Debug {
    /// Stream name
    fn name(&self) -> &str;

    /// Stream namespace
    fn namespace(&self) -> Option<&str> {
        None
    }

    /// JSON schema of the stream's records
    fn json_schema(&self) -> JsonValue;

    /// Primary key
    fn primary_key(&self) -> Vec<String> {
        Vec::new()
    }

    /// Cursor field, for incremental streams
    fn cursor_field(&self) -> Option<String> {
        None
    }

    /// The slices to read, produced as they are discovered
    async fn stream_slices(&self, sync_mode: SyncMode) -> Result<SliceStream>;

    /// Read the items of one slice
    async fn read_records(
        &self,
        sync_mode: SyncMode,
        slice: Option<JsonObject>,
    ) -> Result<StreamDataStream>;

    /// Whether the stream can be read, with the reason if it cannot
    async fn check_availability(&self) -> (bool, Option<String>) {
        (true, None)
    }

    /// User-facing message for an error raised while reading, if the error
    /// is one the user can act on
    fn get_error_display_message(&self, _error: &Error) -> Option<String> {
        None
    }
}
