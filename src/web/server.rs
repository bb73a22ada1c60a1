use anyhow::{Context, Result};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::{RelayMode, Settings};
use crate::core::CompletionClient;
use crate::relay::ChatRelay;
use crate::session::SessionManager;
use crate::storage::{HistoryStore, InMemoryStore, JsonFileStore};
use crate::utils;
use crate::web::routes::{self, AppState, ChatMode};

/// Web server instance
pub struct WebServer {
    bind_addr: SocketAddr,
    state: AppState,
}

impl WebServer {
    /// Wire the relay to the history backend selected by `server.mode`.
    ///
    /// Identifier mode loads the JSON history file here, once.
    pub async fn from_settings(
        settings: &Settings,
        client: Arc<dyn CompletionClient>,
    ) -> Result<Self> {
        let bind_addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port)
            .parse()
            .context("Invalid server.host/server.port")?;

        let (store, mode): (Arc<dyn HistoryStore>, ChatMode) = match settings.server.mode {
            RelayMode::Session => {
                let store = Arc::new(InMemoryStore::new());
                let sessions = Arc::new(SessionManager::new(&settings.session, store.clone()));
                (store as Arc<dyn HistoryStore>, ChatMode::Session(sessions))
            }
            RelayMode::Identifier => {
                let store = Arc::new(JsonFileStore::open(&settings.store.path).await?);
                (store as Arc<dyn HistoryStore>, ChatMode::Identifier)
            }
        };

        let state = AppState {
            relay: Arc::new(ChatRelay::new(client, store)),
            mode,
            index_path: Arc::new(settings.server.index_path.clone()),
        };

        Ok(Self { bind_addr, state })
    }

    /// Routes plus CORS (credentials allowed, origin mirrored) and request tracing.
    pub fn router(&self) -> Router {
        routes::create_router(self.state.clone())
            .layer(CorsLayer::very_permissive())
            .layer(TraceLayer::new_for_http())
    }

    pub async fn start(self) -> Result<()> {
        let app = self.router();

        let mode = match self.state.mode {
            ChatMode::Session(_) => "session cookie",
            ChatMode::Identifier => "user_id",
        };
        utils::print_success(&format!(
            "🚀 OpenSourceBuddy running on http://{}",
            self.bind_addr
        ));
        utils::print_info(&format!("   History keyed by {}", mode));

        let listener = tokio::net::TcpListener::bind(&self.bind_addr)
            .await
            .context(format!("Failed to bind {}", self.bind_addr))?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}
