//! Cursor module
//!
//! Tracks incremental sync progress across partitions that complete out of
//! order, and emits checkpoints as partitions close.
//!
//! # Overview
//!
//! - `Cursor` - the observation/close contract driven by the engine
//! - `NoopCursor` - for full refresh streams
//! - `ConcurrentCursor` - interval-list cursor backed by a `StateConverter`

mod concurrent;
mod types;

pub use concurrent::ConcurrentCursor;
pub use types::{Cursor, CursorField, NoopCursor};
