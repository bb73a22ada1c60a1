//! History Store Abstraction
//!
//! Information Hiding:
//! - Storage backend implementation details hidden behind trait
//! - Session-scoped memory and disk-backed JSON share one contract
//! - Each backend owns its own locking and persistence strategy

use crate::core::{ChatMessage, History};
use anyhow::Result;
use async_trait::async_trait;

pub mod filesystem;
pub mod memory;

pub use filesystem::JsonFileStore;
pub use memory::InMemoryStore;

/// Maps an identifier to its conversation history.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Current history for `id`, or a freshly seeded one if none is stored.
    /// Resolving alone never creates an entry.
    async fn resolve(&self, id: &str) -> Result<History>;

    /// Append one message, creating the seeded history first if needed
    async fn append(&self, id: &str, message: ChatMessage) -> Result<()>;

    /// Drop the history for `id`
    async fn clear(&self, id: &str) -> Result<()>;

    /// All identifiers with a stored history
    async fn list_ids(&self) -> Result<Vec<String>>;

    async fn exists(&self, id: &str) -> Result<bool> {
        Ok(self.list_ids().await?.iter().any(|known| known == id))
    }
}
