//! Concurrent read engine
//!
//! Reads the partitions of one stream in parallel and merges their records
//! into a single lazy stream.
//!
//! # Overview
//!
//! The engine module provides:
//! - `ThreadBasedConcurrentStream` - orchestrates a bounded pool of partition workers
//! - `AvailabilityStrategy` - pre-flight check gating the read
//! - `ReadStats` - counters for records and partitions
//!
//! A coordinator task pulls partitions from the generator and spawns one
//! worker per partition, at most `max_workers` at a time. Workers push their
//! records, then a completion marker, onto one bounded queue. The consumer
//! side of the returned stream closes a partition on the cursor when it
//! pulls that marker, so a checkpoint never precedes the records it covers.

mod types;

pub use types::{AlwaysAvailable, AvailabilityStrategy, ReadStats, StreamAvailability};

use crate::config::ConcurrencyConfig;
use crate::cursor::Cursor;
use crate::error::{Error, Result};
use crate::message::{Message, MessageRepository, StreamStatus};
use crate::partition::{slice_key, Partition, PartitionGenerator, PartitionKey, Record, RecordStream};
use crate::types::{JsonValue, StreamDescriptor, SyncMode};
use futures::StreamExt;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};
use types::{QueueItem, StatsRecorder};

// ============================================================================
// Orchestrator
// ============================================================================

/// Reads one stream by draining its partitions on a bounded worker pool
pub struct ThreadBasedConcurrentStream {
    partition_generator: Arc<dyn PartitionGenerator>,
    cursor: Arc<dyn Cursor>,
    message_repository: Arc<dyn MessageRepository>,
    availability_strategy: Arc<dyn AvailabilityStrategy>,
    stream: StreamDescriptor,
    json_schema: JsonValue,
    primary_key: Vec<String>,
    cursor_field: Option<String>,
    sync_mode: SyncMode,
    config: ConcurrencyConfig,
    stats: Arc<StatsRecorder>,
}

impl ThreadBasedConcurrentStream {
    /// Create an orchestrator with default concurrency settings
    pub fn new(
        stream: StreamDescriptor,
        partition_generator: Arc<dyn PartitionGenerator>,
        cursor: Arc<dyn Cursor>,
        message_repository: Arc<dyn MessageRepository>,
    ) -> Self {
        Self {
            partition_generator,
            cursor,
            message_repository,
            availability_strategy: Arc::new(AlwaysAvailable),
            stream,
            json_schema: JsonValue::Object(serde_json::Map::new()),
            primary_key: Vec::new(),
            cursor_field: None,
            sync_mode: SyncMode::default(),
            config: ConcurrencyConfig::default(),
            stats: Arc::new(StatsRecorder::default()),
        }
    }

    /// Set concurrency settings
    #[must_use]
    pub fn with_config(mut self, config: ConcurrencyConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the availability check
    #[must_use]
    pub fn with_availability_strategy(mut self, strategy: Arc<dyn AvailabilityStrategy>) -> Self {
        self.availability_strategy = strategy;
        self
    }

    /// Set the JSON schema of the stream's records
    #[must_use]
    pub fn with_json_schema(mut self, json_schema: JsonValue) -> Self {
        self.json_schema = json_schema;
        self
    }

    /// Set the primary key
    #[must_use]
    pub fn with_primary_key(mut self, primary_key: Vec<String>) -> Self {
        self.primary_key = primary_key;
        self
    }

    /// Set the cursor field
    #[must_use]
    pub fn with_cursor_field(mut self, cursor_field: impl Into<String>) -> Self {
        self.cursor_field = Some(cursor_field.into());
        self
    }

    /// Set the sync mode passed to the partition generator
    #[must_use]
    pub fn with_sync_mode(mut self, sync_mode: SyncMode) -> Self {
        self.sync_mode = sync_mode;
        self
    }

    /// Stream name
    pub fn name(&self) -> &str {
        &self.stream.name
    }

    /// Stream namespace
    pub fn namespace(&self) -> Option<&str> {
        self.stream.namespace.as_deref()
    }

    /// Stream descriptor
    pub fn stream(&self) -> &StreamDescriptor {
        &self.stream
    }

    /// JSON schema of the stream's records
    pub fn json_schema(&self) -> &JsonValue {
        &self.json_schema
    }

    /// Primary key
    pub fn primary_key(&self) -> &[String] {
        &self.primary_key
    }

    /// Cursor field, for incremental streams
    pub fn cursor_field(&self) -> Option<&str> {
        self.cursor_field.as_deref()
    }

    /// The cursor driven by this orchestrator
    pub fn cursor(&self) -> &Arc<dyn Cursor> {
        &self.cursor
    }

    /// Concurrency settings
    pub fn config(&self) -> &ConcurrencyConfig {
        &self.config
    }

    /// Statistics of the current or last read
    pub fn stats(&self) -> ReadStats {
        self.stats.snapshot()
    }

    /// Run the pre-flight availability check
    pub async fn check_availability(&self) -> StreamAvailability {
        self.availability_strategy.check_availability().await
    }

    /// Read every partition of the stream.
    ///
    /// Fails with [`Error::Unavailable`] without scheduling anything if the
    /// availability check fails. Otherwise the returned stream yields every
    /// record read, and ends with one [`Error::StreamIncomplete`] if any
    /// partition failed, after all other partitions were drained.
    pub async fn read(&self) -> Result<RecordStream> {
        self.read_with_sync_mode(self.sync_mode).await
    }

    /// Same as [`read`](Self::read), overriding the configured sync mode
    pub async fn read_with_sync_mode(&self, sync_mode: SyncMode) -> Result<RecordStream> {
        let availability = self.check_availability().await;
        if let StreamAvailability::Unavailable { message } = availability {
            warn!(stream = %self.stream, reason = ?message, "Stream is unavailable, skipping");
            return Err(Error::unavailable(self.stream.name.clone(), message));
        }

        self.config.validate()?;
        self.stats.reset();
        info!(
            stream = %self.stream,
            max_workers = self.config.max_workers,
            sync_mode = ?sync_mode,
            "Starting concurrent read"
        );
        self.message_repository
            .emit_message(Message::stream_status(self.stream.clone(), StreamStatus::Started));

        let (sender, receiver) = mpsc::channel(self.config.queue_capacity);
        let coordinator = Coordinator {
            stream: self.stream.clone(),
            partition_generator: self.partition_generator.clone(),
            cursor: self.cursor.clone(),
            message_repository: self.message_repository.clone(),
            sync_mode,
            workers: Arc::new(Semaphore::new(self.config.max_workers)),
            log_slices: self.config.log_slices,
            sender,
        };
        let handle = tokio::spawn(coordinator.run());

        let consumer = Consumer {
            stream: self.stream.clone(),
            receiver,
            cursor: self.cursor.clone(),
            message_repository: self.message_repository.clone(),
            stats: self.stats.clone(),
            coordinator: handle,
            failed_partitions: 0,
            first_error: None,
            is_running: false,
            finished: false,
        };

        Ok(Box::pin(futures::stream::unfold(consumer, |mut consumer| async move {
            consumer.next_record().await.map(|item| (item, consumer))
        })))
    }
}

impl fmt::Debug for ThreadBasedConcurrentStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadBasedConcurrentStream")
            .field("stream", &self.stream)
            .field("cursor", &self.cursor)
            .field("primary_key", &self.primary_key)
            .field("cursor_field", &self.cursor_field)
            .field("sync_mode", &self.sync_mode)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Coordinator
// ============================================================================

/// Pulls partitions from the generator and hands them to workers
struct Coordinator {
    stream: StreamDescriptor,
    partition_generator: Arc<dyn PartitionGenerator>,
    cursor: Arc<dyn Cursor>,
    message_repository: Arc<dyn MessageRepository>,
    sync_mode: SyncMode,
    workers: Arc<Semaphore>,
    log_slices: bool,
    sender: mpsc::Sender<QueueItem>,
}

impl Coordinator {
    async fn run(self) {
        let mut workers = JoinSet::new();

        if let Err(e) = self.schedule_partitions(&mut workers).await {
            error!(stream = %self.stream, error = %e, "Partition generation failed");
            let _ = self.sender.send(QueueItem::GenerationError(e)).await;
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                error!(stream = %self.stream, error = %e, "Partition worker panicked");
                let _ = self.sender.send(QueueItem::WorkerPanicked(e.to_string())).await;
            }
        }

        debug!(stream = %self.stream, "All partitions reported back");
        let _ = self.sender.send(QueueItem::Done).await;
    }

    async fn schedule_partitions(&self, workers: &mut JoinSet<()>) -> Result<()> {
        let mut partitions = self.partition_generator.generate(self.sync_mode).await?;

        while let Some(partition) = partitions.next().await {
            let partition = partition?;

            if self.sender.is_closed() {
                debug!(stream = %self.stream, "Record consumer dropped, stop scheduling");
                break;
            }

            let permit = self
                .workers
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| Error::Other(format!("worker pool closed: {e}")))?;

            if self.log_slices {
                self.message_repository
                    .emit_message(Message::info(format!("slice:{}", slice_key(partition.to_slice()))));
            }
            debug!(stream = %self.stream, partition = %PartitionKey::of(partition.as_ref()), "Scheduling partition");

            workers.spawn(read_partition(
                partition,
                self.cursor.clone(),
                self.sender.clone(),
                permit,
            ));
        }
        Ok(())
    }
}

/// Worker body: drain one partition, then report its completion
async fn read_partition(
    partition: Arc<dyn Partition>,
    cursor: Arc<dyn Cursor>,
    sender: mpsc::Sender<QueueItem>,
    _permit: OwnedSemaphorePermit,
) {
    let error = drain_partition(partition.as_ref(), cursor.as_ref(), &sender).await.err();
    let _ = sender
        .send(QueueItem::PartitionComplete { partition, error })
        .await;
}

async fn drain_partition(
    partition: &dyn Partition,
    cursor: &dyn Cursor,
    sender: &mpsc::Sender<QueueItem>,
) -> Result<()> {
    let mut records = partition.read().await?;

    while let Some(record) = records.next().await {
        let mut record = record?;
        if record.associated_slice.is_none() {
            record.associated_slice = partition.to_slice().cloned();
        }
        cursor.observe(&record).await?;
        if sender.send(QueueItem::Record(record)).await.is_err() {
            // Nobody is reading anymore
            break;
        }
    }
    Ok(())
}

// ============================================================================
// Consumer
// ============================================================================

/// Consumer side of the merged record stream
struct Consumer {
    stream: StreamDescriptor,
    receiver: mpsc::Receiver<QueueItem>,
    cursor: Arc<dyn Cursor>,
    message_repository: Arc<dyn MessageRepository>,
    stats: Arc<StatsRecorder>,
    coordinator: JoinHandle<()>,
    failed_partitions: usize,
    first_error: Option<Error>,
    is_running: bool,
    finished: bool,
}

impl Consumer {
    async fn next_record(&mut self) -> Option<Result<Record>> {
        if self.finished {
            return None;
        }

        loop {
            let item = match self.receiver.recv().await {
                Some(item) => item,
                None => {
                    // The coordinator went away without reporting Done
                    let message = match (&mut self.coordinator).await {
                        Err(e) => e.to_string(),
                        Ok(()) => "coordinator exited early".to_string(),
                    };
                    self.record_failure(Error::WorkerPanicked {
                        stream: self.stream.name.clone(),
                        message,
                    });
                    QueueItem::Done
                }
            };

            match item {
                QueueItem::Record(record) => {
                    if !self.is_running {
                        self.is_running = true;
                        self.message_repository.emit_message(Message::stream_status(
                            self.stream.clone(),
                            StreamStatus::Running,
                        ));
                    }
                    self.stats.add_record();
                    return Some(Ok(record));
                }
                QueueItem::PartitionComplete {
                    partition,
                    error: None,
                } => match self.cursor.close_partition(partition.as_ref()).await {
                    Ok(()) => self.stats.add_closed(),
                    Err(e) => self.record_failure(e),
                },
                QueueItem::PartitionComplete {
                    partition,
                    error: Some(e),
                } => {
                    warn!(
                        stream = %self.stream,
                        partition = %PartitionKey::of(partition.as_ref()),
                        error = %e,
                        "Partition failed; no state recorded for it"
                    );
                    self.cursor.discard_partition(partition.as_ref()).await;
                    self.record_failure(e);
                }
                QueueItem::GenerationError(e) => {
                    self.record_failure(Error::PartitionGeneration {
                        stream: self.stream.name.clone(),
                        message: e.to_string(),
                    });
                }
                QueueItem::WorkerPanicked(message) => {
                    self.record_failure(Error::WorkerPanicked {
                        stream: self.stream.name.clone(),
                        message,
                    });
                }
                QueueItem::Done => {
                    self.finished = true;
                    return self.finish().await.err().map(Err);
                }
            }
        }
    }

    fn record_failure(&mut self, error: Error) {
        self.failed_partitions += 1;
        self.stats.add_failed();
        if self.first_error.is_none() {
            self.first_error = Some(error);
        }
    }

    async fn finish(&mut self) -> Result<()> {
        if let Some(first_error) = self.first_error.take() {
            self.emit_status(StreamStatus::Incomplete);
            error!(
                stream = %self.stream,
                failed_partitions = self.failed_partitions,
                "Concurrent read finished with failures"
            );
            return Err(Error::incomplete(
                self.stream.name.clone(),
                self.failed_partitions,
                first_error,
            ));
        }

        if let Err(e) = self.cursor.ensure_at_least_one_state_emitted().await {
            self.emit_status(StreamStatus::Incomplete);
            return Err(e);
        }

        self.emit_status(StreamStatus::Complete);
        let stats = self.stats.snapshot();
        info!(
            stream = %self.stream,
            records = stats.records_read,
            partitions = stats.partitions_closed,
            "Concurrent read complete"
        );
        Ok(())
    }

    fn emit_status(&self, status: StreamStatus) {
        self.message_repository
            .emit_message(Message::stream_status(self.stream.clone(), status));
    }
}
