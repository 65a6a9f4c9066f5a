//! Message types
//!
//! Message envelopes emitted during a read.

use crate::error::Result;
use crate::partition::Record;
use crate::types::{JsonValue, LogLevel, StreamDescriptor};
use chrono::{DateTime, Utc};
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

/// Stream of messages produced by a read
pub type MessageStream = Pin<Box<dyn Stream<Item = Result<Message>> + Send>>;

/// A per-stream checkpoint envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateMessage {
    /// Stream the state belongs to
    pub stream_descriptor: StreamDescriptor,
    /// Opaque stream state
    pub stream_state: JsonValue,
}

/// Lifecycle status of a stream's sync
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StreamStatus {
    /// Reading has been scheduled
    Started,
    /// The first record was produced
    Running,
    /// Every partition was read successfully
    Complete,
    /// At least one partition failed
    Incomplete,
}

/// A message emitted during sync
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// A single record
    Record(Record),
    /// State checkpoint
    State(StateMessage),
    /// Log message
    Log {
        /// Log level
        level: LogLevel,
        /// Log message
        message: String,
    },
    /// Stream status trace
    Trace {
        /// Stream the status refers to
        stream: StreamDescriptor,
        /// New status
        status: StreamStatus,
        /// When the status was emitted
        emitted_at: DateTime<Utc>,
    },
}

impl Message {
    /// Create a record message
    pub fn record(record: Record) -> Self {
        Self::Record(record)
    }

    /// Create a state message
    pub fn state(stream_descriptor: StreamDescriptor, stream_state: JsonValue) -> Self {
        Self::State(StateMessage {
            stream_descriptor,
            stream_state,
        })
    }

    /// Create a log message
    pub fn log(level: LogLevel, message: impl Into<String>) -> Self {
        Self::Log {
            level,
            message: message.into(),
        }
    }

    /// Create an info log
    pub fn info(message: impl Into<String>) -> Self {
        Self::log(LogLevel::Info, message)
    }

    /// Create a debug log
    pub fn debug(message: impl Into<String>) -> Self {
        Self::log(LogLevel::Debug, message)
    }

    /// Create a warning log
    pub fn warn(message: impl Into<String>) -> Self {
        Self::log(LogLevel::Warn, message)
    }

    /// Create an error log
    pub fn error(message: impl Into<String>) -> Self {
        Self::log(LogLevel::Error, message)
    }

    /// Create a stream status trace
    pub fn stream_status(stream: StreamDescriptor, status: StreamStatus) -> Self {
        Self::Trace {
            stream,
            status,
            emitted_at: Utc::now(),
        }
    }

    /// Check if this is a record message
    pub fn is_record(&self) -> bool {
        matches!(self, Self::Record(_))
    }

    /// Check if this is a state message
    pub fn is_state(&self) -> bool {
        matches!(self, Self::State(_))
    }

    /// Check if this is a log message
    pub fn is_log(&self) -> bool {
        matches!(self, Self::Log { .. })
    }

    /// Status carried by a trace message
    pub fn as_stream_status(&self) -> Option<StreamStatus> {
        match self {
            Self::Trace { status, .. } => Some(*status),
            _ => None,
        }
    }
}
