//! Conversation history shared by the filler path and the main response path.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::agent::types::Message;

/// Handle to one live conversation. Appends go through the write guard, so
/// concurrent writers are applied one at a time.
pub type SharedContext = Arc<RwLock<ConversationContext>>;

/// Append-only, chronologically ordered message history.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationContext {
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    updated_at: Option<DateTime<Utc>>,
}

impl ConversationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_messages(messages: Vec<Message>) -> Self {
        Self {
            messages,
            updated_at: Some(Utc::now()),
        }
    }

    pub fn into_shared(self) -> SharedContext {
        Arc::new(RwLock::new(self))
    }

    pub fn add_message(&mut self, message: Message) {
        self.messages.push(message);
        self.updated_at = Some(Utc::now());
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn position(&self, message_id: &str) -> Option<usize> {
        self.messages.iter().position(|m| m.id == message_id)
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// Copy of the history without system instructions and/or function-call
    /// records. The original is left untouched.
    pub fn copy_filtered(&self, exclude_instructions: bool, exclude_function_calls: bool) -> Self {
        let messages = self
            .messages
            .iter()
            .filter(|m| !(exclude_instructions && m.is_instruction()))
            .filter(|m| !(exclude_function_calls && m.is_function_call()))
            .cloned()
            .collect();

        Self {
            messages,
            updated_at: self.updated_at,
        }
    }

    /// Keep only the `max_items` most recent messages.
    ///
    /// A tool output left at the head without its call is dropped too.
    pub fn truncate(mut self, max_items: usize) -> Self {
        if self.messages.len() > max_items {
            let excess = self.messages.len() - max_items;
            self.messages.drain(..excess);
        }

        while self
            .messages
            .first()
            .is_some_and(|m| m.tool_call_id.is_some())
        {
            let orphan = self.messages.remove(0);
            log::debug!("dropping orphaned tool output {}", orphan.id);
        }

        self
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }
}
