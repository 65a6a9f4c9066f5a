//! Partitions over a legacy stream's slices

use super::types::{LegacyStream, StreamData};
use crate::error::{Error, Result};
use crate::message::{Message, MessageRepository};
use crate::partition::{Partition, PartitionGenerator, PartitionStream, Record, RecordStream};
use crate::types::{JsonObject, SyncMode};
use async_trait::async_trait;
use futures::StreamExt;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

// ============================================================================
// Stream Partition
// ============================================================================

/// One slice of a legacy stream
pub struct StreamPartition {
    stream: Arc<dyn LegacyStream>,
    slice: Option<JsonObject>,
    sync_mode: SyncMode,
    message_repository: Arc<dyn MessageRepository>,
    identifier_keys: Vec<String>,
}

impl StreamPartition {
    /// Bind a partition to its own copy of `slice`
    pub fn new(
        stream: Arc<dyn LegacyStream>,
        slice: Option<&JsonObject>,
        sync_mode: SyncMode,
        message_repository: Arc<dyn MessageRepository>,
    ) -> Self {
        Self {
            stream,
            slice: slice.cloned(),
            sync_mode,
            message_repository,
            identifier_keys: Vec::new(),
        }
    }

    /// Slice keys that identify the partition in state
    #[must_use]
    pub fn with_identifier_keys(mut self, keys: Vec<String>) -> Self {
        self.identifier_keys = keys;
        self
    }
}

/// Attach the stream's user-facing message to `error`, if it has one
fn classify(stream: &dyn LegacyStream, error: Error) -> Error {
    match stream.get_error_display_message(&error) {
        Some(display_message) => Error::partition_read(stream.name(), display_message, error),
        None => error,
    }
}

#[async_trait]
impl Partition for StreamPartition {
    fn stream_name(&self) -> &str {
        self.stream.name()
    }

    fn to_slice(&self) -> Option<&JsonObject> {
        self.slice.as_ref()
    }

    fn identifier(&self) -> Option<JsonObject> {
        if self.identifier_keys.is_empty() {
            return None;
        }
        let slice = self.slice.as_ref()?;
        Some(
            self.identifier_keys
                .iter()
                .filter_map(|key| slice.get(key).map(|v| (key.clone(), v.clone())))
                .collect(),
        )
    }

    async fn read(&self) -> Result<RecordStream> {
        let items = self
            .stream
            .read_records(self.sync_mode, self.slice.clone())
            .await
            .map_err(|e| classify(self.stream.as_ref(), e))?;

        let stream = self.stream.clone();
        let repository = self.message_repository.clone();
        let slice = self.slice.clone();

        Ok(Box::pin(items.filter_map(move |item| {
            let out = match item {
                Ok(StreamData::Record(data)) => {
                    Some(Ok(Record::new(data, stream.name()).with_slice(slice.clone())))
                }
                Ok(StreamData::Log { level, message }) => {
                    repository.emit_message(Message::log(level, message));
                    None
                }
                Err(e) => Some(Err(classify(stream.as_ref(), e))),
            };
            futures::future::ready(out)
        })))
    }
}

impl fmt::Debug for StreamPartition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamPartition")
            .field("stream", &self.stream.name())
            .field("slice", &self.slice)
            .field("sync_mode", &self.sync_mode)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Partition Generator
// ============================================================================

/// Turns each slice of a legacy stream into a [`StreamPartition`]
pub struct StreamPartitionGenerator {
    stream: Arc<dyn LegacyStream>,
    message_repository: Arc<dyn MessageRepository>,
    identifier_keys: Vec<String>,
}

impl StreamPartitionGenerator {
    /// Create a generator over `stream`
    pub fn new(stream: Arc<dyn LegacyStream>, message_repository: Arc<dyn MessageRepository>) -> Self {
        Self {
            stream,
            message_repository,
            identifier_keys: Vec::new(),
        }
    }

    /// Slice keys that identify each partition in state
    #[must_use]
    pub fn with_identifier_keys(mut self, keys: Vec<String>) -> Self {
        self.identifier_keys = keys;
        self
    }
}

#[async_trait]
impl PartitionGenerator for StreamPartitionGenerator {
    async fn generate(&self, sync_mode: SyncMode) -> Result<PartitionStream> {
        let slices = self.stream.stream_slices(sync_mode).await?;
        debug!(stream = self.stream.name(), "Generating partitions");

        let stream = self.stream.clone();
        let repository = self.message_repository.clone();
        let identifier_keys = self.identifier_keys.clone();
        Ok(Box::pin(slices.map(move |slice| -> Result<Arc<dyn Partition>> {
            let slice = slice?;
            let partition = StreamPartition::new(
                stream.clone(),
                slice.as_ref(),
                sync_mode,
                repository.clone(),
            )
            .with_identifier_keys(identifier_keys.clone());
            Ok(Arc::new(partition) as Arc<dyn Partition>)
        })))
    }
}
