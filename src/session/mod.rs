//! Signed Session Capabilities
//!
//! Information Hiding:
//! - Token format and signature scheme hidden behind open/close
//! - Expiry bookkeeping kept apart from the history store
//! - Callers only ever see an opaque cookie value and a history key

use crate::config::SessionConfig;
use crate::storage::{HistoryStore, InMemoryStore};
use anyhow::Result;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// A live session: the key under which its history is stored and the
/// cookie value that proves possession of it.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    pub id: String,
    pub cookie_value: String,
    pub is_new: bool,
}

/// Mints and verifies session tokens and tracks their sliding expiry.
///
/// Histories themselves live in an [`InMemoryStore`] keyed by the token id,
/// so the session manager never touches message contents.
pub struct SessionManager {
    store: Arc<InMemoryStore>,
    expiries: RwLock<HashMap<String, DateTime<Utc>>>,
    secret: String,
    lifetime: Duration,
    cookie_name: String,
}

impl SessionManager {
    pub fn new(config: &SessionConfig, store: Arc<InMemoryStore>) -> Self {
        Self {
            store,
            expiries: RwLock::new(HashMap::new()),
            secret: config.secret.clone(),
            lifetime: Duration::seconds(config.lifetime_secs as i64),
            cookie_name: config.cookie_name.clone(),
        }
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    pub fn lifetime_secs(&self) -> i64 {
        self.lifetime.num_seconds()
    }

    /// Resume the session named by `cookie_value`, or start a new one when
    /// the cookie is absent, forged, or expired. The expiry slides forward.
    pub async fn open(&self, cookie_value: Option<&str>) -> Result<SessionHandle> {
        self.purge_expired().await?;
        let now = Utc::now();

        if let Some(id) = cookie_value.and_then(|value| self.verify(value)) {
            let mut expiries = self.expiries.write().await;
            if let Some(expires_at) = expiries.get_mut(&id) {
                *expires_at = now + self.lifetime;
                return Ok(SessionHandle {
                    cookie_value: self.sign(&id),
                    id,
                    is_new: false,
                });
            }
            tracing::debug!("[SessionManager] Cookie for unknown session, issuing a new one");
        }

        let id = Uuid::new_v4().to_string();
        self.expiries
            .write()
            .await
            .insert(id.clone(), now + self.lifetime);
        tracing::debug!("[SessionManager] Started session {}", id);

        Ok(SessionHandle {
            cookie_value: self.sign(&id),
            id,
            is_new: true,
        })
    }

    /// Forget the session named by `cookie_value`, if it is genuine.
    pub async fn close(&self, cookie_value: Option<&str>) -> Result<()> {
        let Some(id) = cookie_value.and_then(|value| self.verify(value)) else {
            return Ok(());
        };
        self.expiries.write().await.remove(&id);
        self.store.clear(&id).await?;
        tracing::debug!("[SessionManager] Closed session {}", id);
        Ok(())
    }

    pub async fn active_sessions(&self) -> usize {
        self.expiries.read().await.len()
    }

    async fn purge_expired(&self) -> Result<()> {
        let now = Utc::now();
        let expired: Vec<String> = {
            let mut expiries = self.expiries.write().await;
            let expired = expiries
                .iter()
                .filter(|(_, expires_at)| **expires_at <= now)
                .map(|(id, _)| id.clone())
                .collect::<Vec<_>>();
            for id in &expired {
                expiries.remove(id);
            }
            expired
        };

        for id in &expired {
            self.store.clear(id).await?;
        }
        if !expired.is_empty() {
            tracing::info!("[SessionManager] Expired {} sessions", expired.len());
        }
        Ok(())
    }

    fn signature(&self, id: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.secret.as_bytes());
        hasher.update(b":");
        hasher.update(id.as_bytes());
        URL_SAFE_NO_PAD.encode(hasher.finalize())
    }

    fn sign(&self, id: &str) -> String {
        format!("{}.{}", id, self.signature(id))
    }

    fn verify(&self, cookie_value: &str) -> Option<String> {
        let (id, signature) = cookie_value.split_once('.')?;
        if Uuid::parse_str(id).is_err() {
            return None;
        }
        if !constant_time_eq(self.signature(id).as_bytes(), signature.as_bytes()) {
            tracing::warn!("[SessionManager] Rejected cookie with bad signature");
            return None;
        }
        Some(id.to_string())
    }
}

/// Byte comparison whose running time does not depend on where the inputs differ.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
