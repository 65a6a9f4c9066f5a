//! State management module
//!
//! Handles per-stream state persistence and the translation between the
//! legacy single-value cursor state and the interval-list state used by
//! concurrent reads.
//!
//! # Overview
//!
//! The state module provides:
//! - `State` - Per-stream state container, persisted as JSON
//! - `ConnectorStateManager` - Owns `{stream, namespace} -> state` and builds checkpoint envelopes
//! - `converters` - Legacy/concurrent state conversion and interval merging

pub mod converters;
mod manager;
mod types;

pub use manager::ConnectorStateManager;
pub use types::State;
