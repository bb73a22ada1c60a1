//! Per-identifier conversation history
//!
//! Information Hiding:
//! - Persona seeding hidden behind construction; callers never push a system message
//! - Backing vector exposed read-only so the persona cannot be removed or duplicated

use super::llm::{ChatMessage, Role};
use super::persona::PERSONA_PROMPT;
use serde::Serialize;

/// Ordered messages for one conversation, oldest first, persona at index 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct History {
    messages: Vec<ChatMessage>,
}

impl History {
    /// A fresh history holding only the persona message.
    pub fn seeded() -> Self {
        Self {
            messages: vec![ChatMessage::system(PERSONA_PROMPT)],
        }
    }

    /// Rebuilds a history from stored messages.
    ///
    /// Stored system messages are dropped and the persona is put back at
    /// the head, so a hand-edited or legacy file cannot break the invariant.
    pub fn from_messages(messages: Vec<ChatMessage>) -> Self {
        let mut history = Self::seeded();
        history.messages.extend(
            messages
                .into_iter()
                .filter(|message| message.role != Role::System),
        );
        history
    }

    /// Appends a conversational message. System messages are ignored.
    pub fn push(&mut self, message: ChatMessage) {
        if message.role == Role::System {
            tracing::warn!("[History] Ignoring attempt to append a second system message");
            return;
        }
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Never true; a history always carries its persona.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }
}

impl Default for History {
    fn default() -> Self {
        Self::seeded()
    }
}
