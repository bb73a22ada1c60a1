//! In-Memory History Store
//!
//! Information Hiding:
//! - HashMap storage structure hidden from users
//! - Thread-safe access via RwLock hidden behind async interface
//! - Backs cookie sessions; data is lost when the process exits

use super::HistoryStore;
use crate::core::{ChatMessage, History};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

pub struct InMemoryStore {
    histories: RwLock<HashMap<String, History>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            histories: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HistoryStore for InMemoryStore {
    async fn resolve(&self, id: &str) -> Result<History> {
        let histories = self.histories.read().await;
        let history = histories.get(id).cloned().unwrap_or_default();
        tracing::debug!(
            "[InMemoryStore] Resolved {} messages for '{}'",
            history.len(),
            id
        );
        Ok(history)
    }

    async fn append(&self, id: &str, message: ChatMessage) -> Result<()> {
        let mut histories = self.histories.write().await;
        let history = histories.entry(id.to_string()).or_default();
        history.push(message);
        tracing::debug!(
            "[InMemoryStore] '{}' now holds {} messages",
            id,
            history.len()
        );
        Ok(())
    }

    async fn clear(&self, id: &str) -> Result<()> {
        let mut histories = self.histories.write().await;
        if histories.remove(id).is_some() {
            tracing::debug!("[InMemoryStore] Cleared '{}'", id);
        }
        Ok(())
    }

    async fn list_ids(&self) -> Result<Vec<String>> {
        let histories = self.histories.read().await;
        Ok(histories.keys().cloned().collect())
    }

    async fn exists(&self, id: &str) -> Result<bool> {
        let histories = self.histories.read().await;
        Ok(histories.contains_key(id))
    }
}
