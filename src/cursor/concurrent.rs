//! Interval-list cursor
//!
//! Every successfully read partition contributes one interval; intervals are
//! merged after each close and a checkpoint is emitted whenever the list
//! grew. All mutation happens under one lock per cursor.

use super::types::{Cursor, CursorField};
use crate::error::{Error, Result};
use crate::message::MessageRepository;
use crate::partition::{Partition, PartitionKey, Record};
use crate::state::converters::{ConcurrentState, Interval, StateConverter};
use crate::state::ConnectorStateManager;
use crate::types::{JsonValue, StreamDescriptor};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Mutable cursor state, only touched under the cursor's lock
#[derive(Debug)]
struct CursorInner<V> {
    state: ConcurrentState<V>,
    most_recent_by_partition: HashMap<PartitionKey, V>,
    closed: HashSet<PartitionKey>,
    has_emitted: bool,
}

/// Cursor keeping a merged list of synced intervals
pub struct ConcurrentCursor<C: StateConverter> {
    stream: StreamDescriptor,
    message_repository: Arc<dyn MessageRepository>,
    state_manager: ConnectorStateManager,
    converter: C,
    cursor_field: CursorField,
    /// Slice keys of the lower and upper boundaries, if the stream slices on them
    slice_boundary_fields: Option<(String, String)>,
    /// Low-water mark the sync started from
    start: C::Value,
    inner: Mutex<CursorInner<C::Value>>,
    warned_missing_field: AtomicBool,
}

impl<C: StateConverter> ConcurrentCursor<C> {
    /// Create a cursor from the stream's persisted state.
    ///
    /// `stream_state` may be in the legacy or the concurrent format.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        stream: StreamDescriptor,
        stream_state: &JsonValue,
        message_repository: Arc<dyn MessageRepository>,
        state_manager: ConnectorStateManager,
        converter: C,
        cursor_field: CursorField,
        slice_boundary_fields: Option<(String, String)>,
        start: Option<C::Value>,
    ) -> Result<Self> {
        let mut state =
            converter.convert_from_sequential_state(&cursor_field, stream_state, start.clone())?;
        state.slices = converter.merge_intervals(std::mem::take(&mut state.slices));

        let sync_start = state
            .slices
            .first()
            .map(|s| s.most_recent_cursor_value.clone().unwrap_or_else(|| s.end.clone()))
            .or(start)
            .unwrap_or_else(|| converter.zero_value());

        debug!(
            stream = %stream,
            slices = state.slices.len(),
            start = ?sync_start,
            "Initialized concurrent cursor"
        );

        Ok(Self {
            stream,
            message_repository,
            state_manager,
            converter,
            cursor_field,
            slice_boundary_fields,
            start: sync_start,
            inner: Mutex::new(CursorInner {
                state,
                most_recent_by_partition: HashMap::new(),
                closed: HashSet::new(),
                has_emitted: false,
            }),
            warned_missing_field: AtomicBool::new(false),
        })
    }

    /// Stream this cursor tracks
    pub fn stream(&self) -> &StreamDescriptor {
        &self.stream
    }

    /// The cursor field
    pub fn cursor_field(&self) -> &CursorField {
        &self.cursor_field
    }

    /// The converter
    pub fn converter(&self) -> &C {
        &self.converter
    }

    /// Low-water mark the sync started from
    pub fn start(&self) -> &C::Value {
        &self.start
    }

    /// Snapshot of the merged intervals
    pub async fn intervals(&self) -> Vec<Interval<C::Value>> {
        self.inner.lock().await.state.slices.clone()
    }

    /// `(start, end)` of every merged interval, for slicing what is left
    pub async fn covered_ranges(&self) -> Vec<(C::Value, C::Value)> {
        self.inner
            .lock()
            .await
            .state
            .slices
            .iter()
            .map(|s| (s.start.clone(), s.end.clone()))
            .collect()
    }

    fn extract_from_slice(&self, partition: &dyn Partition, key: &str) -> Result<C::Value> {
        let raw = partition
            .to_slice()
            .and_then(|slice| slice.get(key))
            .ok_or_else(|| Error::missing_boundary(key))?;
        self.converter.parse_value(raw)
    }

    async fn emit_state(&self, inner: &mut CursorInner<C::Value>) -> Result<()> {
        let stream_state = self
            .converter
            .convert_to_state_message(&self.cursor_field, &inner.state);
        self.state_manager
            .update_state_for_stream(&self.stream, stream_state)
            .await?;
        let message = self.state_manager.create_state_message(&self.stream).await;
        self.message_repository.emit_message(message);
        inner.has_emitted = true;
        Ok(())
    }
}

#[async_trait]
impl<C: StateConverter> Cursor for ConcurrentCursor<C> {
    async fn observe(&self, record: &Record) -> Result<()> {
        // The slice already encodes progress
        if self.slice_boundary_fields.is_some() {
            return Ok(());
        }

        let Ok(raw) = self.cursor_field.extract_value(record) else {
            if !self.warned_missing_field.swap(true, Ordering::Relaxed) {
                warn!(
                    stream = %self.stream,
                    cursor_field = self.cursor_field.key(),
                    "Could not find cursor field in record; progress will not be tracked for it"
                );
            }
            return Ok(());
        };
        let value = self.converter.parse_value(raw)?;

        let mut inner = self.inner.lock().await;
        inner
            .most_recent_by_partition
            .entry(PartitionKey::of_record(record))
            .and_modify(|current| {
                if value > *current {
                    *current = value.clone();
                }
            })
            .or_insert(value);
        Ok(())
    }

    async fn close_partition(&self, partition: &dyn Partition) -> Result<()> {
        let key = PartitionKey::of(partition);
        let mut inner = self.inner.lock().await;

        if inner.closed.contains(&key) {
            debug!(stream = %self.stream, partition = %key, "Partition already closed");
            return Ok(());
        }

        let identifier = partition.identifier().unwrap_or_default();
        let interval = match &self.slice_boundary_fields {
            Some((lower, upper)) => Some(
                Interval::new(
                    self.extract_from_slice(partition, lower)?,
                    self.extract_from_slice(partition, upper)?,
                )
                .with_partition(identifier),
            ),
            None => inner
                .most_recent_by_partition
                .remove(&key)
                .map(|most_recent| {
                    // Records older than the resume point extend the range downwards
                    let (low, high) = if most_recent < self.start {
                        (most_recent.clone(), self.start.clone())
                    } else {
                        (self.start.clone(), most_recent.clone())
                    };
                    Interval::new(low, high)
                        .with_most_recent(Some(most_recent))
                        .with_partition(identifier)
                }),
        };
        inner.closed.insert(key);

        let slice_count_before = inner.state.slices.len();
        if let Some(interval) = interval {
            inner.state.slices.push(interval);
        }
        if inner.state.slices.len() <= slice_count_before {
            debug!(stream = %self.stream, "No progress to record for partition");
            return Ok(());
        }

        let slices = std::mem::take(&mut inner.state.slices);
        inner.state.slices = self.converter.merge_intervals(slices);
        self.emit_state(&mut inner).await
    }

    async fn discard_partition(&self, partition: &dyn Partition) {
        let key = PartitionKey::of(partition);
        if self.inner.lock().await.most_recent_by_partition.remove(&key).is_some() {
            debug!(stream = %self.stream, partition = %key, "Discarded observations of failed partition");
        }
    }

    async fn ensure_at_least_one_state_emitted(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.has_emitted {
            return Ok(());
        }
        self.emit_state(&mut inner).await
    }

    async fn state(&self) -> JsonValue {
        let inner = self.inner.lock().await;
        self.converter
            .convert_to_state_message(&self.cursor_field, &inner.state)
    }
}

impl<C: StateConverter> fmt::Debug for ConcurrentCursor<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConcurrentCursor")
            .field("stream", &self.stream)
            .field("cursor_field", &self.cursor_field)
            .field("slice_boundary_fields", &self.slice_boundary_fields)
            .field("start", &self.start)
            .finish_non_exhaustive()
    }
}
