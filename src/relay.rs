//! Chat Relay - one conversational turn
//!
//! Information Hiding:
//! - Which backend holds the history is invisible to the turn logic
//! - Completion client errors propagate unchanged; nothing is retried

use crate::core::{ChatMessage, CompletionClient};
use crate::storage::HistoryStore;
use anyhow::Result;
use std::sync::Arc;

pub struct ChatRelay {
    client: Arc<dyn CompletionClient>,
    store: Arc<dyn HistoryStore>,
}

impl ChatRelay {
    pub fn new(client: Arc<dyn CompletionClient>, store: Arc<dyn HistoryStore>) -> Self {
        Self { client, store }
    }

    /// Record `message` for `id`, ask the model with the whole history and
    /// record its reply.
    ///
    /// If the completion call fails the user message stays recorded and no
    /// assistant message is added.
    pub async fn turn(&self, id: &str, message: &str) -> Result<String> {
        self.store.append(id, ChatMessage::user(message)).await?;
        let history = self.store.resolve(id).await?;

        tracing::info!(
            "[ChatRelay] Turn for '{}' with {} messages of context",
            id,
            history.len()
        );

        let reply = self.client.complete(history.messages()).await?;

        self.store
            .append(id, ChatMessage::assistant(reply.clone()))
            .await?;
        Ok(reply)
    }
}
