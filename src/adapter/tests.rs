//! Tests for legacy stream adapters

use super::*;
use crate::config::ConcurrencyConfig;
use crate::cursor::{ConcurrentCursor, CursorField, NoopCursor};
use crate::engine::{AlwaysAvailable, AvailabilityStrategy, StreamAvailability};
use crate::error::{Error, Result};
use crate::message::{InMemoryMessageRepository, Message, MessageRepository, StreamStatus};
use crate::partition::{Partition, PartitionGenerator, Record};
use crate::state::converters::EpochValueConverter;
use crate::state::ConnectorStateManager;
use crate::types::{JsonObject, JsonValue, LogLevel, StreamDescriptor, SyncMode};
use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;

// ============================================================================
// Fixtures
// ============================================================================

/// Legacy stream with one slice per `[start, end)` pair, two records each
#[derive(Debug)]
struct Invoices {
    ranges: Vec<(i64, i64)>,
    failing_start: Option<i64>,
    available: bool,
}

impl Invoices {
    fn new(ranges: Vec<(i64, i64)>) -> Self {
        Self {
            ranges,
            failing_start: None,
            available: true,
        }
    }
}

fn object(value: JsonValue) -> JsonObject {
    value.as_object().cloned().unwrap_or_default()
}

#[async_trait]
impl LegacyStream for Invoices {
    fn name(&self) -> &str {
        "invoices"
    }

    fn namespace(&self) -> Option<&str> {
        Some("billing")
    }

    fn json_schema(&self) -> JsonValue {
        json!({"type": "object", "properties": {"id": {"type": "integer"}}})
    }

    fn primary_key(&self) -> Vec<String> {
        vec!["id".to_string()]
    }

    fn cursor_field(&self) -> Option<String> {
        Some("updated_at".to_string())
    }

    async fn stream_slices(&self, _sync_mode: SyncMode) -> Result<SliceStream> {
        let slices: Vec<Result<Option<JsonObject>>> = self
            .ranges
            .iter()
            .map(|(start, end)| Ok(Some(object(json!({"start": start, "end": end})))))
            .collect();
        Ok(Box::pin(futures::stream::iter(slices)))
    }

    async fn read_records(
        &self,
        _sync_mode: SyncMode,
        slice: Option<JsonObject>,
    ) -> Result<StreamDataStream> {
        let start = slice
            .as_ref()
            .and_then(|s| s.get("start"))
            .and_then(JsonValue::as_i64)
            .unwrap_or_default();

        let mut items = vec![
            Ok(StreamData::log(LogLevel::Info, format!("reading from {start}"))),
            Ok(StreamData::record(object(json!({"id": start, "updated_at": start + 1})))),
        ];
        if self.failing_start == Some(start) {
            items.push(Err(Error::Other("HTTP 500".to_string())));
        } else {
            items.push(Ok(StreamData::record(object(
                json!({"id": start + 1, "updated_at": start + 2}),
            ))));
        }
        Ok(Box::pin(futures::stream::iter(items)))
    }

    async fn check_availability(&self) -> (bool, Option<String>) {
        if self.available {
            (true, None)
        } else {
            (false, Some("missing scope invoices:read".to_string()))
        }
    }

    fn get_error_display_message(&self, error: &Error) -> Option<String> {
        error
            .to_string()
            .contains("HTTP 500")
            .then(|| "The billing API is having issues".to_string())
    }
}

fn descriptor() -> StreamDescriptor {
    StreamDescriptor::new("invoices", Some("billing"))
}

fn range_cursor(repository: Arc<InMemoryMessageRepository>) -> Arc<dyn crate::cursor::Cursor> {
    Arc::new(
        ConcurrentCursor::new(
            descriptor(),
            &json!({}),
            repository,
            ConnectorStateManager::in_memory(),
            EpochValueConverter::new(),
            CursorField::new("updated_at"),
            Some(("start".to_string(), "end".to_string())),
            chrono::DateTime::from_timestamp(0, 0),
        )
        .unwrap(),
    )
}

fn facade(stream: Invoices, repository: Arc<InMemoryMessageRepository>) -> StreamFacade {
    StreamFacade::create_from_stream(
        Arc::new(stream),
        range_cursor(repository.clone()),
        repository,
        ConcurrencyConfig::new().with_max_workers(2),
    )
}

// ============================================================================
// StreamPartition Tests
// ============================================================================

#[test]
fn test_partition_owns_a_copy_of_the_slice() {
    let mut slice = object(json!({"start": 0, "end": 10}));
    let partition = StreamPartition::new(
        Arc::new(Invoices::new(vec![])),
        Some(&slice),
        SyncMode::Incremental,
        Arc::new(InMemoryMessageRepository::new()),
    );

    slice.insert("start".to_string(), json!(5));

    assert_eq!(partition.to_slice(), Some(&object(json!({"start": 0, "end": 10}))));
    assert_eq!(partition.stream_name(), "invoices");
}

#[tokio::test]
async fn test_partition_read_forwards_logs_and_tags_records() {
    let repository = Arc::new(InMemoryMessageRepository::new());
    let slice = object(json!({"start": 10, "end": 20}));
    let partition = StreamPartition::new(
        Arc::new(Invoices::new(vec![])),
        Some(&slice),
        SyncMode::Incremental,
        repository.clone(),
    );

    let records: Vec<Record> = partition.read().await.unwrap().try_collect().await.unwrap();

    assert_eq!(records.len(), 2);
    assert!(records
        .iter()
        .all(|r| r.stream_name == "invoices" && r.associated_slice.as_ref() == Some(&slice)));
    assert_eq!(
        repository.consume_queue(),
        vec![Message::log(LogLevel::Info, "reading from 10")]
    );
}

#[tokio::test]
async fn test_partition_read_attaches_display_message() {
    let mut stream = Invoices::new(vec![]);
    stream.failing_start = Some(10);
    let slice = object(json!({"start": 10, "end": 20}));
    let partition = StreamPartition::new(
        Arc::new(stream),
        Some(&slice),
        SyncMode::Incremental,
        Arc::new(InMemoryMessageRepository::new()),
    );

    let items: Vec<Result<Record>> = partition.read().await.unwrap().collect().await;

    assert_eq!(items.len(), 2);
    let error = items.into_iter().last().unwrap().unwrap_err();
    assert!(matches!(error, Error::PartitionRead { .. }));
    assert_eq!(error.display_message(), Some("The billing API is having issues"));
}

#[test]
fn test_partition_identifier() {
    let slice = object(json!({"start": 0, "end": 10, "account": "acme"}));
    let partition = StreamPartition::new(
        Arc::new(Invoices::new(vec![])),
        Some(&slice),
        SyncMode::Incremental,
        Arc::new(InMemoryMessageRepository::new()),
    );
    assert_eq!(partition.identifier(), None);

    let partition = partition.with_identifier_keys(vec!["account".to_string()]);
    assert_eq!(partition.identifier(), Some(object(json!({"account": "acme"}))));
}

// ============================================================================
// StreamPartitionGenerator Tests
// ============================================================================

#[tokio::test]
async fn test_generator_one_partition_per_slice() {
    let generator = StreamPartitionGenerator::new(
        Arc::new(Invoices::new(vec![(0, 10), (10, 20), (20, 30)])),
        Arc::new(InMemoryMessageRepository::new()),
    );

    let partitions: Vec<Arc<dyn Partition>> = generator
        .generate(SyncMode::Incremental)
        .await
        .unwrap()
        .try_collect()
        .await
        .unwrap();

    let starts: Vec<i64> = partitions
        .iter()
        .filter_map(|p| p.to_slice().and_then(|s| s.get("start")).and_then(JsonValue::as_i64))
        .collect();
    assert_eq!(starts, vec![0, 10, 20]);
}

/// Legacy stream whose second slice is only discovered once the first slice
/// is being read
#[derive(Debug, Default)]
struct Paged {
    first_read: Arc<tokio::sync::Notify>,
}

#[async_trait]
impl LegacyStream for Paged {
    fn name(&self) -> &str {
        "pages"
    }

    fn json_schema(&self) -> JsonValue {
        json!({"type": "object"})
    }

    async fn stream_slices(&self, _sync_mode: SyncMode) -> Result<SliceStream> {
        let first_read = self.first_read.clone();
        Ok(Box::pin(futures::stream::unfold(0, move |page| {
            let first_read = first_read.clone();
            async move {
                match page {
                    0 => {}
                    1 => first_read.notified().await,
                    _ => return None,
                }
                Some((Ok::<_, Error>(Some(object(json!({"page": page})))), page + 1))
            }
        })))
    }

    async fn read_records(
        &self,
        _sync_mode: SyncMode,
        slice: Option<JsonObject>,
    ) -> Result<StreamDataStream> {
        let page = slice
            .as_ref()
            .and_then(|s| s.get("page"))
            .cloned()
            .unwrap_or_default();
        if page == json!(0) {
            self.first_read.notify_one();
        }
        Ok(Box::pin(futures::stream::iter([Ok(StreamData::record(object(
            json!({"page": page}),
        )))])))
    }
}

#[tokio::test]
async fn test_generator_yields_before_later_slices_exist() {
    let generator = StreamPartitionGenerator::new(
        Arc::new(Paged::default()),
        Arc::new(InMemoryMessageRepository::new()),
    );
    let mut partitions = generator.generate(SyncMode::FullRefresh).await.unwrap();

    let first = tokio::time::timeout(std::time::Duration::from_secs(5), partitions.next())
        .await
        .expect("first partition available before the second slice")
        .unwrap()
        .unwrap();
    let records: Vec<Record> = first.read().await.unwrap().try_collect().await.unwrap();
    assert_eq!(records.len(), 1);

    let second = tokio::time::timeout(std::time::Duration::from_secs(5), partitions.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(second.to_slice(), Some(&object(json!({"page": 1}))));
    assert!(partitions.next().await.is_none());
}

#[tokio::test]
async fn test_facade_reads_while_slices_are_discovered() {
    let facade = StreamFacade::create_from_stream(
        Arc::new(Paged::default()),
        Arc::new(NoopCursor),
        Arc::new(InMemoryMessageRepository::new()),
        ConcurrencyConfig::default(),
    );

    let items: Vec<StreamData> = tokio::time::timeout(std::time::Duration::from_secs(5), async {
        facade
            .read_records(SyncMode::FullRefresh, None)
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap()
    })
    .await
    .expect("read completes without waiting for every slice up front");
    assert_eq!(items.len(), 2);
}

#[tokio::test]
async fn test_generator_surfaces_slice_error() {
    #[derive(Debug)]
    struct Broken;

    #[async_trait]
    impl LegacyStream for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn json_schema(&self) -> JsonValue {
            json!({})
        }

        async fn stream_slices(&self, _sync_mode: SyncMode) -> Result<SliceStream> {
            Ok(Box::pin(futures::stream::iter([
                Ok(None::<JsonObject>),
                Err(Error::Other("listing failed".to_string())),
            ])))
        }

        async fn read_records(
            &self,
            _sync_mode: SyncMode,
            _slice: Option<JsonObject>,
        ) -> Result<StreamDataStream> {
            Ok(Box::pin(futures::stream::empty()))
        }
    }

    let generator =
        StreamPartitionGenerator::new(Arc::new(Broken), Arc::new(InMemoryMessageRepository::new()));
    let results: Vec<Result<Arc<dyn Partition>>> = generator
        .generate(SyncMode::FullRefresh)
        .await
        .unwrap()
        .collect()
        .await;
    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok());
    assert!(matches!(&results[1], Err(Error::Other(m)) if m == "listing failed"));
}

// ============================================================================
// Availability Tests
// ============================================================================

#[tokio::test]
async fn test_stream_availability_strategy() {
    let mut stream = Invoices::new(vec![]);
    stream.available = false;
    let strategy = StreamAvailabilityStrategy::new(Arc::new(stream));

    assert_eq!(
        strategy.check_availability().await,
        StreamAvailability::unavailable("missing scope invoices:read")
    );

    let available = StreamAvailabilityStrategy::new(Arc::new(Invoices::new(vec![])));
    assert!(available.check_availability().await.is_available());
}

#[tokio::test]
async fn test_availability_strategy_facade() {
    let facade = AvailabilityStrategyFacade::new(Arc::new(AlwaysAvailable));
    assert_eq!(facade.check_availability().await, (true, None));

    let mut stream = Invoices::new(vec![]);
    stream.available = false;
    let facade =
        AvailabilityStrategyFacade::new(Arc::new(StreamAvailabilityStrategy::new(Arc::new(stream))));
    assert_eq!(
        facade.check_availability().await,
        (false, Some("missing scope invoices:read".to_string()))
    );
}

// ============================================================================
// StreamFacade Tests
// ============================================================================

#[test]
fn test_facade_metadata() {
    let facade = facade(
        Invoices::new(vec![]),
        Arc::new(InMemoryMessageRepository::new()),
    );

    assert_eq!(facade.name(), "invoices");
    assert_eq!(facade.namespace(), Some("billing"));
    assert_eq!(facade.primary_key(), vec!["id".to_string()]);
    assert_eq!(facade.cursor_field(), Some("updated_at".to_string()));
    assert_eq!(facade.json_schema()["type"], json!("object"));
    assert_eq!(facade.orchestrator().config().max_workers, 2);
}

#[tokio::test]
async fn test_facade_read_messages() {
    let repository = Arc::new(InMemoryMessageRepository::new());
    let facade = facade(
        Invoices::new(vec![(0, 10), (10, 20), (20, 30)]),
        repository.clone(),
    );

    let messages: Vec<Message> = facade
        .read_messages(SyncMode::Incremental)
        .await
        .unwrap()
        .try_collect()
        .await
        .unwrap();

    let records = messages.iter().filter(|m| m.is_record()).count();
    let states: Vec<&JsonValue> = messages
        .iter()
        .filter_map(|m| match m {
            Message::State(state) => Some(&state.stream_state),
            _ => None,
        })
        .collect();
    let statuses: Vec<StreamStatus> = messages.iter().filter_map(Message::as_stream_status).collect();

    assert_eq!(records, 6);
    assert!(!states.is_empty() && states.len() <= 3);
    assert_eq!(states.last(), Some(&&json!({"updated_at": 30})));
    assert_eq!(
        statuses,
        vec![StreamStatus::Started, StreamStatus::Running, StreamStatus::Complete]
    );
    assert_eq!(messages.iter().filter(|m| m.is_log()).count(), 3);
    assert!(repository.is_empty());
    assert_eq!(facade.stats().partitions_closed, 3);
}

#[tokio::test]
async fn test_facade_checkpoint_follows_its_records() {
    let repository = Arc::new(InMemoryMessageRepository::new());
    let facade = facade(Invoices::new(vec![(0, 10)]), repository);

    let messages: Vec<Message> = facade
        .read_messages(SyncMode::Incremental)
        .await
        .unwrap()
        .try_collect()
        .await
        .unwrap();

    let last_record = messages.iter().rposition(Message::is_record).unwrap();
    let first_state = messages.iter().position(Message::is_state).unwrap();
    assert!(first_state > last_record);
}

#[tokio::test]
async fn test_facade_unavailable() {
    let mut stream = Invoices::new(vec![(0, 10)]);
    stream.available = false;
    let repository = Arc::new(InMemoryMessageRepository::new());
    let facade = facade(stream, repository.clone());

    assert_eq!(
        facade.check_availability().await,
        (false, Some("missing scope invoices:read".to_string()))
    );
    let error = facade
        .read_messages(SyncMode::Incremental)
        .await
        .err()
        .unwrap();
    assert!(matches!(error, Error::Unavailable { .. }));
    assert!(repository.is_empty());
}

#[tokio::test]
async fn test_facade_failed_slice_ends_with_error() {
    let mut stream = Invoices::new(vec![(0, 10), (10, 20)]);
    stream.failing_start = Some(10);
    let repository = Arc::new(InMemoryMessageRepository::new());
    let facade = facade(stream, repository);

    let items: Vec<Result<Message>> = facade
        .read_messages(SyncMode::Incremental)
        .await
        .unwrap()
        .collect()
        .await;

    let error = items.last().unwrap().as_ref().unwrap_err();
    assert!(error.is_incomplete_sync());
    assert_eq!(
        facade.get_error_display_message(error),
        Some("The billing API is having issues".to_string())
    );
    let records = items
        .iter()
        .filter(|i| matches!(i, Ok(Message::Record(_))))
        .count();
    assert_eq!(records, 3);
}

#[tokio::test]
async fn test_facade_as_legacy_stream() {
    let facade = StreamFacade::create_from_stream(
        Arc::new(Invoices::new(vec![(0, 10), (10, 20)])),
        Arc::new(NoopCursor),
        Arc::new(InMemoryMessageRepository::new()),
        ConcurrencyConfig::default(),
    );

    let slices: Vec<Option<JsonObject>> = facade
        .stream_slices(SyncMode::FullRefresh)
        .await
        .unwrap()
        .try_collect()
        .await
        .unwrap();
    assert_eq!(slices, vec![None]);

    let items: Vec<StreamData> = facade
        .read_records(SyncMode::FullRefresh, None)
        .await
        .unwrap()
        .try_collect()
        .await
        .unwrap();
    assert_eq!(items.len(), 4);
    assert!(items.iter().all(|i| matches!(i, StreamData::Record(_))));
}
