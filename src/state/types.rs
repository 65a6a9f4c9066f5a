//! State types for tracking sync progress
//!
//! These types are serialized to JSON and persisted between runs.

use crate::message::StateMessage;
use crate::types::{JsonValue, StreamDescriptor};
use serde::{Deserialize, Serialize};

/// Complete state for a source: one entry per stream
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct State {
    /// Per-stream state
    #[serde(default)]
    pub streams: Vec<StateMessage>,
}

impl State {
    /// Create a new empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Get state for a stream
    pub fn get_stream(&self, stream: &StreamDescriptor) -> Option<&JsonValue> {
        self.streams
            .iter()
            .find(|s| &s.stream_descriptor == stream)
            .map(|s| &s.stream_state)
    }

    /// Replace the state of a stream, adding it if absent
    pub fn set_stream(&mut self, stream: &StreamDescriptor, stream_state: JsonValue) {
        match self
            .streams
            .iter_mut()
            .find(|s| &s.stream_descriptor == stream)
        {
            Some(entry) => entry.stream_state = stream_state,
            None => self.streams.push(StateMessage {
                stream_descriptor: stream.clone(),
                stream_state,
            }),
        }
    }

    /// Remove the state of a stream
    pub fn remove_stream(&mut self, stream: &StreamDescriptor) {
        self.streams.retain(|s| &s.stream_descriptor != stream);
    }
}
