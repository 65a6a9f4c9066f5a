//! Engine types
//!
//! Availability verdicts, read statistics and the items exchanged between
//! partition workers and the record consumer.

use crate::error::Error;
use crate::partition::{Partition, Record};
use async_trait::async_trait;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// ============================================================================
// Availability
// ============================================================================

/// Outcome of the pre-flight availability check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamAvailability {
    /// The stream can be read
    Available,
    /// The stream cannot be read
    Unavailable {
        /// Reason shown to the user, if known
        message: Option<String>,
    },
}

impl StreamAvailability {
    /// The stream can be read
    pub fn available() -> Self {
        Self::Available
    }

    /// The stream cannot be read, for the given reason
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: Some(message.into()),
        }
    }

    /// Check if the stream can be read
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available)
    }

    /// Reason the stream is unavailable
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Available => None,
            Self::Unavailable { message } => message.as_deref(),
        }
    }
}

/// Pre-flight check run before any partition is scheduled
#[async_trait]
pub trait AvailabilityStrategy: Send + Sync + fmt::Debug {
    /// Decide whether the stream can be read
    async fn check_availability(&self) -> StreamAvailability;
}

/// Availability strategy that never blocks a read
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysAvailable;

#[async_trait]
impl AvailabilityStrategy for AlwaysAvailable {
    async fn check_availability(&self) -> StreamAvailability {
        StreamAvailability::Available
    }
}

// ============================================================================
// Statistics
// ============================================================================

/// Statistics of a read
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadStats {
    /// Records handed to the caller
    pub records_read: usize,
    /// Partitions read to completion and closed on the cursor
    pub partitions_closed: usize,
    /// Partitions whose read failed
    pub partitions_failed: usize,
}

/// Counters shared between the orchestrator and its record consumer
#[derive(Debug, Default)]
pub(crate) struct StatsRecorder {
    records_read: AtomicUsize,
    partitions_closed: AtomicUsize,
    partitions_failed: AtomicUsize,
}

impl StatsRecorder {
    pub(crate) fn add_record(&self) {
        self.records_read.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_closed(&self) {
        self.partitions_closed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_failed(&self) {
        self.partitions_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn reset(&self) {
        self.records_read.store(0, Ordering::Relaxed);
        self.partitions_closed.store(0, Ordering::Relaxed);
        self.partitions_failed.store(0, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> ReadStats {
        ReadStats {
            records_read: self.records_read.load(Ordering::Relaxed),
            partitions_closed: self.partitions_closed.load(Ordering::Relaxed),
            partitions_failed: self.partitions_failed.load(Ordering::Relaxed),
        }
    }
}

// ============================================================================
// Queue Items
// ============================================================================

/// What workers and the coordinator push to the record consumer
#[derive(Debug)]
pub(crate) enum QueueItem {
    /// A record read from some partition
    Record(Record),
    /// A partition finished; every one of its records was queued before this
    PartitionComplete {
        partition: Arc<dyn Partition>,
        error: Option<Error>,
    },
    /// The partition generator failed; no further partitions are scheduled
    GenerationError(Error),
    /// A worker task panicked
    WorkerPanicked(String),
    /// Every scheduled partition reported back
    Done,
}
