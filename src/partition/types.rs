//! Partition types and traits
//!
//! Defines the core partition abstractions.

use crate::error::Result;
use crate::types::{JsonObject, JsonValue, SyncMode};
use async_trait::async_trait;
use futures::Stream;
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;

/// Lazy, finite stream of records produced by one partition
pub type RecordStream = Pin<Box<dyn Stream<Item = Result<Record>> + Send>>;

/// Lazy, finite stream of partitions produced by a generator
pub type PartitionStream = Pin<Box<dyn Stream<Item = Result<Arc<dyn Partition>>> + Send>>;

// ============================================================================
// Record
// ============================================================================

/// A single extracted record
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Record payload
    pub data: JsonObject,
    /// Name of the stream the record belongs to
    pub stream_name: String,
    /// Slice of the partition that produced the record
    pub associated_slice: Option<JsonObject>,
}

impl Record {
    /// Create a record not tied to any slice
    pub fn new(data: JsonObject, stream_name: impl Into<String>) -> Self {
        Self {
            data,
            stream_name: stream_name.into(),
            associated_slice: None,
        }
    }

    /// Tie the record to the slice of the partition that produced it
    #[must_use]
    pub fn with_slice(mut self, slice: Option<JsonObject>) -> Self {
        self.associated_slice = slice;
        self
    }

    /// Get a field of the payload
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.data.get(key)
    }
}

// ============================================================================
// Partition
// ============================================================================

/// An independently readable, bounded slice of a stream
#[async_trait]
pub trait Partition: Send + Sync + fmt::Debug {
    /// Name of the stream this partition belongs to
    fn stream_name(&self) -> &str;

    /// The slice descriptor, if the stream is sliced
    fn to_slice(&self) -> Option<&JsonObject>;

    /// Fields of the slice used for state bookkeeping
    fn identifier(&self) -> Option<JsonObject> {
        None
    }

    /// Read every record of the partition.
    ///
    /// The returned stream must be drainable on a single worker without
    /// sharing anything with other partitions.
    async fn read(&self) -> Result<RecordStream>;
}

/// Canonical string form of a slice, stable across equal descriptors
pub fn slice_key(slice: Option<&JsonObject>) -> String {
    match slice {
        // serde_json maps are key-ordered, so equal slices serialize equally
        Some(slice) => JsonValue::Object(slice.clone()).to_string(),
        None => "null".to_string(),
    }
}

/// Hashable identity of a partition: stream name plus slice
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PartitionKey {
    /// Stream name
    pub stream: String,
    /// Canonical slice
    pub slice: String,
}

impl PartitionKey {
    /// Build the key of a partition
    pub fn of(partition: &dyn Partition) -> Self {
        Self {
            stream: partition.stream_name().to_string(),
            slice: slice_key(partition.to_slice()),
        }
    }

    /// Build the key a record's partition would have
    pub fn of_record(record: &Record) -> Self {
        Self {
            stream: record.stream_name.clone(),
            slice: slice_key(record.associated_slice.as_ref()),
        }
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.stream, self.slice)
    }
}

// ============================================================================
// Partition Generator
// ============================================================================

/// Produces the partitions of a stream
#[async_trait]
pub trait PartitionGenerator: Send + Sync {
    /// Start producing partitions for the given sync mode.
    ///
    /// Calling this again restarts from the first partition.
    async fn generate(&self, sync_mode: SyncMode) -> Result<PartitionStream>;
}
