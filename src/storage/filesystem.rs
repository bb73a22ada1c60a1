//! Disk-Backed History Store
//!
//! Information Hiding:
//! - File path and JSON layout hidden from users
//! - Whole mapping kept in memory, loaded once when the store is opened
//! - Every mutation rewrites the full mapping via temp file + rename

use super::HistoryStore;
use crate::core::{ChatMessage, History};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;

/// All histories in one JSON object: `{ "<id>": [{"role", "content"}, ...] }`.
///
/// The mutex is held across the file write, so appends for the same or
/// different identifiers are applied one at a time and none is lost.
pub struct JsonFileStore {
    path: PathBuf,
    histories: Mutex<BTreeMap<String, History>>,
}

impl JsonFileStore {
    /// Load the mapping from `path`, starting empty if the file is absent.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let histories = Self::load(&path).await?;

        tracing::info!(
            "[JsonFileStore] Loaded {} conversations from {:?}",
            histories.len(),
            path
        );

        Ok(Self {
            path,
            histories: Mutex::new(histories),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(path: &Path) -> Result<BTreeMap<String, History>> {
        if !fs::try_exists(path)
            .await
            .context(format!("Failed to stat history file: {:?}", path))?
        {
            tracing::debug!("[JsonFileStore] No history file at {:?}, starting empty", path);
            return Ok(BTreeMap::new());
        }

        let json = fs::read_to_string(path)
            .await
            .context(format!("Failed to read history file: {:?}", path))?;

        if json.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        let raw: BTreeMap<String, Vec<ChatMessage>> =
            serde_json::from_str(&json).context("Failed to deserialize history file")?;

        Ok(raw
            .into_iter()
            .map(|(id, messages)| (id, History::from_messages(messages)))
            .collect())
    }

    async fn persist(&self, histories: &BTreeMap<String, History>) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create history directory")?;
        }

        let json = serde_json::to_string_pretty(histories)
            .context("Failed to serialize conversation histories")?;

        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, json)
            .await
            .context(format!("Failed to write history file: {:?}", tmp_path))?;
        fs::rename(&tmp_path, &self.path)
            .await
            .context(format!("Failed to replace history file: {:?}", self.path))?;

        tracing::debug!(
            "[JsonFileStore] Wrote {} conversations to {:?}",
            histories.len(),
            self.path
        );
        Ok(())
    }
}

/// Undo an in-memory change whose write failed, so memory matches the file.
fn restore(histories: &mut BTreeMap<String, History>, id: &str, previous: Option<History>) {
    tracing::warn!("[JsonFileStore] Write failed, rolling back '{}'", id);
    match previous {
        Some(history) => {
            histories.insert(id.to_string(), history);
        }
        None => {
            histories.remove(id);
        }
    }
}

#[async_trait]
impl HistoryStore for JsonFileStore {
    async fn resolve(&self, id: &str) -> Result<History> {
        let histories = self.histories.lock().await;
        Ok(histories.get(id).cloned().unwrap_or_default())
    }

    async fn append(&self, id: &str, message: ChatMessage) -> Result<()> {
        let mut histories = self.histories.lock().await;
        let previous = histories.get(id).cloned();

        let mut updated = previous.clone().unwrap_or_default();
        updated.push(message);
        histories.insert(id.to_string(), updated);

        if let Err(e) = self.persist(&histories).await {
            restore(&mut histories, id, previous);
            return Err(e);
        }
        Ok(())
    }

    async fn clear(&self, id: &str) -> Result<()> {
        let mut histories = self.histories.lock().await;
        let Some(previous) = histories.remove(id) else {
            tracing::debug!("[JsonFileStore] '{}' does not exist, nothing to clear", id);
            return Ok(());
        };

        if let Err(e) = self.persist(&histories).await {
            restore(&mut histories, id, Some(previous));
            return Err(e);
        }
        Ok(())
    }

    async fn list_ids(&self) -> Result<Vec<String>> {
        let histories = self.histories.lock().await;
        Ok(histories.keys().cloned().collect())
    }

    async fn exists(&self, id: &str) -> Result<bool> {
        let histories = self.histories.lock().await;
        Ok(histories.contains_key(id))
    }
}
