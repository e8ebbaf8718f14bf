//! Message log management
//!
//! The run keeps an append-only log of every message exchanged with the
//! model. Nothing is trimmed: ordering is the context the model sees.

use crate::core::Message;

/// Append-only message log
#[derive(Debug, Clone, Default)]
pub struct MessageLog {
    messages: Vec<Message>,
}

impl MessageLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Add a user message
    pub fn add_user(&mut self, content: impl Into<String>) {
        self.push(Message::user(content));
    }

    /// Add an assistant message
    pub fn add_assistant(&mut self, content: impl Into<String>) {
        self.push(Message::assistant(content));
    }

    /// All messages, oldest first
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Get message count
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Project a history onto the entries used to seed a phase context.
///
/// Tool results are dropped; every other entry is kept in order.
pub fn observation_seed(messages: &[Message]) -> Vec<Message> {
    messages
        .iter()
        .filter(|m| match m {
            Message::ToolResult { .. } => false,
            Message::System { .. } | Message::User { .. } | Message::Assistant { .. } => true,
        })
        .cloned()
        .collect()
}
