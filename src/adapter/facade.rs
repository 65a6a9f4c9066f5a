//! Legacy stream contract implemented on top of the concurrent engine

use super::availability::{AvailabilityStrategyFacade, StreamAvailabilityStrategy};
use super::partition::StreamPartitionGenerator;
use super::types::{LegacyStream, SliceStream, StreamData, StreamDataStream};
use crate::config::ConcurrencyConfig;
use crate::cursor::Cursor;
use crate::engine::{ReadStats, ThreadBasedConcurrentStream};
use crate::error::{Error, Result};
use crate::message::{Message, MessageRepository, MessageStream};
use crate::partition::RecordStream;
use crate::types::{JsonObject, JsonValue, StreamDescriptor, SyncMode};
use async_trait::async_trait;
use futures::StreamExt;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::debug;

/// A legacy stream whose reads go through [`ThreadBasedConcurrentStream`]
#[derive(Debug)]
pub struct StreamFacade {
    legacy: Arc<dyn LegacyStream>,
    orchestrator: ThreadBasedConcurrentStream,
    message_repository: Arc<dyn MessageRepository>,
    availability: AvailabilityStrategyFacade,
}

impl StreamFacade {
    /// Wrap `stream` so that its slices are read concurrently.
    ///
    /// Streams with a cursor field are read incrementally, all others in
    /// full refresh.
    pub fn create_from_stream(
        stream: Arc<dyn LegacyStream>,
        cursor: Arc<dyn Cursor>,
        message_repository: Arc<dyn MessageRepository>,
        config: ConcurrencyConfig,
    ) -> Self {
        let descriptor = StreamDescriptor::new(stream.name(), stream.namespace());
        let sync_mode = if stream.cursor_field().is_some() {
            SyncMode::Incremental
        } else {
            SyncMode::FullRefresh
        };
        let generator = StreamPartitionGenerator::new(stream.clone(), message_repository.clone());
        let availability_strategy = Arc::new(StreamAvailabilityStrategy::new(stream.clone()));

        let mut orchestrator = ThreadBasedConcurrentStream::new(
            descriptor,
            Arc::new(generator),
            cursor,
            message_repository.clone(),
        )
        .with_config(config)
        .with_availability_strategy(availability_strategy.clone())
        .with_json_schema(stream.json_schema())
        .with_primary_key(stream.primary_key())
        .with_sync_mode(sync_mode);
        if let Some(cursor_field) = stream.cursor_field() {
            orchestrator = orchestrator.with_cursor_field(cursor_field);
        }

        Self {
            legacy: stream,
            orchestrator,
            message_repository,
            availability: AvailabilityStrategyFacade::new(availability_strategy),
        }
    }

    /// The underlying orchestrator
    pub fn orchestrator(&self) -> &ThreadBasedConcurrentStream {
        &self.orchestrator
    }

    /// The cursor tracking this stream
    pub fn cursor(&self) -> &Arc<dyn Cursor> {
        self.orchestrator.cursor()
    }

    /// Statistics of the current or last read
    pub fn stats(&self) -> ReadStats {
        self.orchestrator.stats()
    }

    /// Read the stream as protocol messages.
    ///
    /// Records are interleaved with whatever the cursor and the orchestrator
    /// queued in the message repository (checkpoints, statuses, logs) since
    /// the previous record. A failed read ends with the error, after the
    /// messages queued before it.
    pub async fn read_messages(&self, sync_mode: SyncMode) -> Result<MessageStream> {
        let records = self.orchestrator.read_with_sync_mode(sync_mode).await?;
        let reader = MessageReader {
            records,
            message_repository: self.message_repository.clone(),
            pending: VecDeque::new(),
            done: false,
        };

        Ok(Box::pin(futures::stream::unfold(reader, |mut reader| async move {
            reader.next_message().await.map(|item| (item, reader))
        })))
    }
}

/// Interleaves records with repository messages
struct MessageReader {
    records: RecordStream,
    message_repository: Arc<dyn MessageRepository>,
    pending: VecDeque<Result<Message>>,
    done: bool,
}

impl MessageReader {
    async fn next_message(&mut self) -> Option<Result<Message>> {
        loop {
            if let Some(item) = self.pending.pop_front() {
                return Some(item);
            }
            if self.done {
                return None;
            }

            let next = self.records.next().await;
            // Checkpoints queued while pulling this record cover earlier records
            self.pending
                .extend(self.message_repository.consume_queue().into_iter().map(Ok));
            match next {
                Some(Ok(record)) => self.pending.push_back(Ok(Message::record(record))),
                Some(Err(e)) => {
                    self.pending.push_back(Err(e));
                    self.done = true;
                }
                None => self.done = true,
            }
        }
    }
}

#[async_trait]
impl LegacyStream for StreamFacade {
    fn name(&self) -> &str {
        self.orchestrator.name()
    }

    fn namespace(&self) -> Option<&str> {
        self.orchestrator.namespace()
    }

    fn json_schema(&self) -> JsonValue {
        self.orchestrator.json_schema().clone()
    }

    fn primary_key(&self) -> Vec<String> {
        self.orchestrator.primary_key().to_vec()
    }

    fn cursor_field(&self) -> Option<String> {
        self.orchestrator.cursor_field().map(str::to_string)
    }

    /// The facade reads every partition itself, so it exposes a single slice
    async fn stream_slices(&self, _sync_mode: SyncMode) -> Result<SliceStream> {
        Ok(Box::pin(futures::stream::iter([Ok::<Option<JsonObject>, Error>(None)])))
    }

    async fn read_records(
        &self,
        sync_mode: SyncMode,
        slice: Option<JsonObject>,
    ) -> Result<StreamDataStream> {
        if slice.is_some() {
            debug!(stream = self.name(), "Ignoring slice, the facade reads all partitions");
        }
        let records = self.orchestrator.read_with_sync_mode(sync_mode).await?;
        Ok(Box::pin(
            records.map(|record| record.map(|r| StreamData::Record(r.data))),
        ))
    }

    async fn check_availability(&self) -> (bool, Option<String>) {
        self.availability.check_availability().await
    }

    fn get_error_display_message(&self, error: &Error) -> Option<String> {
        error
            .display_message()
            .map(str::to_string)
            .or_else(|| self.legacy.get_error_display_message(error))
    }
}
