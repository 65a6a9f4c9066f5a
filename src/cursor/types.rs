//! Cursor contract

use crate::error::{Error, Result};
use crate::partition::{Partition, Record};
use crate::types::{JsonObject, JsonValue};
use async_trait::async_trait;
use std::fmt;

/// Field of a record holding its cursor value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorField {
    cursor_field_key: String,
}

impl CursorField {
    /// Create a cursor field
    pub fn new(cursor_field_key: impl Into<String>) -> Self {
        Self {
            cursor_field_key: cursor_field_key.into(),
        }
    }

    /// The record key
    pub fn key(&self) -> &str {
        &self.cursor_field_key
    }

    /// Cursor value of a record
    pub fn extract_value<'a>(&self, record: &'a Record) -> Result<&'a JsonValue> {
        match record.get(&self.cursor_field_key) {
            Some(value) if !value.is_null() => Ok(value),
            _ => Err(Error::cursor(
                &record.stream_name,
                format!("Could not find cursor field `{}` in record", self.cursor_field_key),
            )),
        }
    }
}

/// Tracks the progress of a sync.
///
/// `observe` is called once per record from the task reading that record's
/// partition. `close_partition` is called exactly once per partition whose
/// read completed without error, after all of its records were delivered.
#[async_trait]
pub trait Cursor: Send + Sync + fmt::Debug {
    /// Indicate that a record has been emitted
    async fn observe(&self, record: &Record) -> Result<()>;

    /// Indicate that a partition has been fully and successfully read
    async fn close_partition(&self, partition: &dyn Partition) -> Result<()>;

    /// Forget what was observed for a partition whose read failed
    async fn discard_partition(&self, _partition: &dyn Partition) {}

    /// Emit the current state if no checkpoint was emitted yet
    async fn ensure_at_least_one_state_emitted(&self) -> Result<()>;

    /// Current state in the form checkpoints carry
    async fn state(&self) -> JsonValue;
}

/// Cursor for streams without incremental state
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCursor;

#[async_trait]
impl Cursor for NoopCursor {
    async fn observe(&self, _record: &Record) -> Result<()> {
        Ok(())
    }

    async fn close_partition(&self, _partition: &dyn Partition) -> Result<()> {
        Ok(())
    }

    async fn ensure_at_least_one_state_emitted(&self) -> Result<()> {
        Ok(())
    }

    async fn state(&self) -> JsonValue {
        JsonValue::Object(JsonObject::new())
    }
}
