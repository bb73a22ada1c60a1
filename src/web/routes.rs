use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, HeaderValue},
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

use crate::core::persona::{is_farewell, FAREWELL};
use crate::relay::ChatRelay;
use crate::session::SessionManager;
use crate::web::{
    error::AppError,
    protocol::{ChatRequest, ChatResponse},
};

/// How `/chat` finds the history for a request.
#[derive(Clone)]
pub enum ChatMode {
    /// Signed cookie names a server-side session
    Session(Arc<SessionManager>),
    /// `user_id` in the body names a persisted history
    Identifier,
}

/// Application state shared across routes
#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<ChatRelay>,
    pub mode: ChatMode,
    pub index_path: Arc<PathBuf>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(serve_index))
        .route("/chat", post(chat))
        .with_state(state)
}

/// GET / - landing page
async fn serve_index(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let page = tokio::fs::read_to_string(state.index_path.as_path())
        .await
        .map_err(AppError::IndexNotFound)?;
    Ok(Html(page))
}

/// POST /chat - one conversational turn
async fn chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let request = ChatRequest::parse(&body)?;

    match &state.mode {
        ChatMode::Session(sessions) => chat_in_session(&state, sessions, &headers, request).await,
        ChatMode::Identifier => chat_by_identifier(&state, request).await,
    }
}

async fn chat_in_session(
    state: &AppState,
    sessions: &SessionManager,
    headers: &HeaderMap,
    request: ChatRequest,
) -> Result<Response, AppError> {
    let cookie = read_cookie(headers, sessions.cookie_name());

    if is_farewell(&request.message) {
        sessions.close(cookie).await?;
        let expired = session_cookie(sessions.cookie_name(), "", 0)?;
        return Ok((
            [(header::SET_COOKIE, expired)],
            Json(ChatResponse {
                response: FAREWELL.to_string(),
                user_id: None,
            }),
        )
            .into_response());
    }

    let session = sessions.open(cookie).await?;
    let reply = match state.relay.turn(&session.id, &request.message).await {
        Ok(reply) => reply,
        Err(e) => {
            // The client never receives a cookie for a session minted by a failed turn.
            if session.is_new {
                sessions.close(Some(&session.cookie_value)).await?;
            }
            return Err(e.into());
        }
    };

    let cookie = session_cookie(
        sessions.cookie_name(),
        &session.cookie_value,
        sessions.lifetime_secs(),
    )?;
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(ChatResponse {
            response: reply,
            user_id: None,
        }),
    )
        .into_response())
}

async fn chat_by_identifier(state: &AppState, request: ChatRequest) -> Result<Response, AppError> {
    let user_id = request
        .user_id
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    // Farewell never touches the store, even for an unseen identifier.
    let response = if is_farewell(&request.message) {
        FAREWELL.to_string()
    } else {
        state.relay.turn(&user_id, &request.message).await?
    };

    Ok(Json(ChatResponse {
        response,
        user_id: Some(user_id),
    })
    .into_response())
}

fn read_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

fn session_cookie(name: &str, value: &str, max_age: i64) -> Result<HeaderValue, AppError> {
    HeaderValue::from_str(&format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        name, value, max_age
    ))
    .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid session cookie: {}", e)))
}
