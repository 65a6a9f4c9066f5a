//! Protocol messages and the message repository
//!
//! Non-record messages (checkpoints, stream statuses, logs) are pushed into a
//! [`MessageRepository`] by the cursor and the orchestrator, and drained by
//! whoever drives the read.

mod repository;
mod types;

pub use repository::{InMemoryMessageRepository, MessageRepository, NoopMessageRepository};
pub use types::{Message, MessageStream, StateMessage, StreamStatus};
