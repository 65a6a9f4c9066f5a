// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::unused_async)]

//! # partiflow
//!
//! Concurrent, partitioned data extraction with a single consistent
//! incremental cursor.
//!
//! A stream is split into independent partitions (typically date slices)
//! that are read in parallel on a bounded worker pool. Partitions complete
//! out of order; the cursor records each completed partition as an interval
//! and merges the intervals into checkpoints, so a resumed sync re-reads
//! exactly the partitions that did not finish.
//!
//! ## Features
//!
//! - **Bounded concurrency**: at most `max_workers` partitions read at a time
//! - **Interval-list state**: checkpoints reflect exactly the completed partitions
//! - **Legacy state compatibility**: reads and writes the single-scalar cursor format
//! - **Legacy stream adapters**: run slice-based streams on the concurrent engine
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use partiflow::adapter::StreamFacade;
//! use partiflow::config::ConcurrencyConfig;
//! use partiflow::message::InMemoryMessageRepository;
//! use partiflow::{Result, SyncMode};
//!
//! async fn sync(stream: std::sync::Arc<dyn partiflow::adapter::LegacyStream>) -> Result<()> {
//!     let repository = std::sync::Arc::new(InMemoryMessageRepository::new());
//!     let facade = StreamFacade::create_from_stream(
//!         stream,
//!         std::sync::Arc::new(partiflow::cursor::NoopCursor),
//!         repository,
//!         ConcurrencyConfig::new().with_max_workers(4),
//!     );
//!
//!     let mut messages = facade.read_messages(SyncMode::FullRefresh).await?;
//!     while let Some(message) = messages.next().await {
//!         // Records, checkpoints, statuses and logs, in order
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │ adapter: LegacyStream ──► StreamFacade                        │
//! └───────────────────────────────┬───────────────────────────────┘
//!                                 │
//! ┌───────────────────────────────┴───────────────────────────────┐
//! │ engine: ThreadBasedConcurrentStream                           │
//! │   generator ─► coordinator ─► workers (≤ max_workers) ─► queue │
//! └──────────────┬────────────────────────────────┬───────────────┘
//!                │                                │
//! ┌──────────────┴──────────────┐  ┌──────────────┴───────────────┐
//! │ partition: Partition,       │  │ cursor: ConcurrentCursor     │
//! │ PartitionGenerator, Slicer  │  │ state: converters, manager   │
//! └─────────────────────────────┘  └──────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Concurrency configuration
pub mod config;

/// Protocol messages and the message repository
pub mod message;

/// Records, partitions and partition generators
pub mod partition;

/// State management and state converters
pub mod state;

/// Sync progress tracking
pub mod cursor;

/// Concurrent read engine
pub mod engine;

/// Adapters for slice-based legacy streams
pub mod adapter;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

pub use cursor::{ConcurrentCursor, Cursor, CursorField, NoopCursor};
pub use engine::ThreadBasedConcurrentStream;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
