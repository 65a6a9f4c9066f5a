//! Connector state manager
//!
//! Owns the `{stream, namespace} -> state` mapping and builds checkpoint
//! envelopes. Optionally persisted to a JSON file with atomic writes.

use super::types::State;
use crate::error::{Error, Result};
use crate::message::Message;
use crate::types::{JsonValue, StreamDescriptor};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// State manager shared by every cursor of a source
#[derive(Debug)]
pub struct ConnectorStateManager {
    /// Path to the state file (empty for in-memory)
    path: PathBuf,
    /// Current state
    state: Arc<RwLock<State>>,
    /// Whether to save on every update
    auto_save: bool,
    /// Serializes writers of the state file
    save_lock: Arc<Mutex<()>>,
}

impl ConnectorStateManager {
    /// Create a state manager persisted at the given path
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            state: Arc::new(RwLock::new(State::new())),
            auto_save: true,
            save_lock: Arc::default(),
        }
    }

    /// Create an in-memory state manager (no file persistence)
    pub fn in_memory() -> Self {
        Self {
            path: PathBuf::new(),
            state: Arc::new(RwLock::new(State::new())),
            auto_save: false,
            save_lock: Arc::default(),
        }
    }

    /// Create an in-memory state manager seeded with existing state
    pub fn with_state(state: State) -> Self {
        Self {
            path: PathBuf::new(),
            state: Arc::new(RwLock::new(state)),
            auto_save: false,
            save_lock: Arc::default(),
        }
    }

    /// Create a state manager from a file, loading existing state if present
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let state = if path.exists() {
            let contents = std::fs::read_to_string(&path).map_err(|e| Error::State {
                message: format!("Failed to read state file: {e}"),
            })?;
            serde_json::from_str(&contents).map_err(|e| Error::State {
                message: format!("Failed to parse state file: {e}"),
            })?
        } else {
            State::new()
        };

        Ok(Self {
            path,
            state: Arc::new(RwLock::new(state)),
            auto_save: true,
            save_lock: Arc::default(),
        })
    }

    /// Create a state manager from an inline JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let state: State = serde_json::from_str(json).map_err(|e| Error::State {
            message: format!("Failed to parse state JSON: {e}"),
        })?;
        Ok(Self::with_state(state))
    }

    /// Current state of a stream, `{}` if none
    pub async fn get_stream_state(&self, stream: &StreamDescriptor) -> JsonValue {
        let state = self.state.read().await;
        state
            .get_stream(stream)
            .cloned()
            .unwrap_or_else(|| JsonValue::Object(serde_json::Map::new()))
    }

    /// Replace the state of a stream
    pub async fn update_state_for_stream(
        &self,
        stream: &StreamDescriptor,
        stream_state: JsonValue,
    ) -> Result<()> {
        {
            let mut state = self.state.write().await;
            state.set_stream(stream, stream_state);
        }

        if self.auto_save {
            self.save().await?;
        }

        Ok(())
    }

    /// Build a checkpoint envelope carrying the stream's current state
    pub async fn create_state_message(&self, stream: &StreamDescriptor) -> Message {
        let stream_state = self.get_stream_state(stream).await;
        Message::state(stream.clone(), stream_state)
    }

    /// Save current state to file
    pub async fn save(&self) -> Result<()> {
        if self.is_in_memory() {
            return Ok(());
        }

        let _guard = self.save_lock.lock().await;
        let contents = self.to_json_pretty().await?;

        // Write to temp file first, then rename for atomicity
        let temp_path = self.path.with_extension("tmp");
        tokio::fs::write(&temp_path, &contents)
            .await
            .map_err(|e| Error::State {
                message: format!("Failed to write state file: {e}"),
            })?;

        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| Error::State {
                message: format!("Failed to rename state file: {e}"),
            })?;

        Ok(())
    }

    /// Snapshot of the full state
    pub async fn snapshot(&self) -> State {
        self.state.read().await.clone()
    }

    /// Export state as JSON string
    pub async fn to_json(&self) -> Result<String> {
        let state = self.state.read().await;
        serde_json::to_string(&*state).map_err(|e| Error::State {
            message: format!("Failed to serialize state: {e}"),
        })
    }

    /// Export state as pretty-printed JSON string
    pub async fn to_json_pretty(&self) -> Result<String> {
        let state = self.state.read().await;
        serde_json::to_string_pretty(&*state).map_err(|e| Error::State {
            message: format!("Failed to serialize state: {e}"),
        })
    }

    /// Clear state for a specific stream
    pub async fn clear_stream(&self, stream: &StreamDescriptor) -> Result<()> {
        {
            let mut state = self.state.write().await;
            state.remove_stream(stream);
        }

        if self.auto_save {
            self.save().await?;
        }

        Ok(())
    }

    /// Get the state file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if using in-memory mode
    pub fn is_in_memory(&self) -> bool {
        self.path.as_os_str().is_empty()
    }
}

impl Clone for ConnectorStateManager {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            state: Arc::clone(&self.state),
            auto_save: self.auto_save,
            save_lock: Arc::clone(&self.save_lock),
        }
    }
}
