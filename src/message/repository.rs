//! Message repositories
//!
//! A repository is a shared sink: producers on any worker call
//! `emit_message`, the read driver calls `consume_queue`.

use super::types::Message;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Mutex;

/// Sink for non-record messages
pub trait MessageRepository: Send + Sync + fmt::Debug {
    /// Queue a message
    fn emit_message(&self, message: Message);

    /// Take every queued message, oldest first
    fn consume_queue(&self) -> Vec<Message>;
}

/// FIFO repository kept in memory
#[derive(Debug, Default)]
pub struct InMemoryMessageRepository {
    queue: Mutex<VecDeque<Message>>,
}

impl InMemoryMessageRepository {
    /// Create an empty repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of queued messages
    pub fn len(&self) -> usize {
        self.queue.lock().map_or(0, |q| q.len())
    }

    /// Whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MessageRepository for InMemoryMessageRepository {
    fn emit_message(&self, message: Message) {
        // A poisoned queue only means another producer panicked mid-push;
        // the deque itself is still consistent.
        let mut queue = self
            .queue
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        queue.push_back(message);
    }

    fn consume_queue(&self) -> Vec<Message> {
        let mut queue = self
            .queue
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        queue.drain(..).collect()
    }
}

/// Repository that drops everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMessageRepository;

impl MessageRepository for NoopMessageRepository {
    fn emit_message(&self, _message: Message) {}

    fn consume_queue(&self) -> Vec<Message> {
        Vec::new()
    }
}
