//! Integration tests for the chat relay
//!
//! These drive the full router without a network listener or API key

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use osbuddy::core::persona::{FAREWELL, PERSONA_PROMPT};
use osbuddy::{ChatMessage, CompletionClient, LLMClient, RelayMode, Role, Settings, WebServer};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::{tempdir, TempDir};
use tower::ServiceExt;

/// Replies "reply N" and remembers every history it was given.
#[derive(Default)]
struct ScriptedClient {
    calls: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedClient {
    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn call(&self, index: usize) -> Vec<ChatMessage> {
        self.calls.lock().unwrap()[index].clone()
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    async fn complete(&self, messages: &[ChatMessage]) -> anyhow::Result<String> {
        let mut calls = self.calls.lock().unwrap();
        calls.push(messages.to_vec());
        Ok(format!("reply {}", calls.len()))
    }
}

struct BrokenClient;

#[async_trait]
impl CompletionClient for BrokenClient {
    async fn complete(&self, _messages: &[ChatMessage]) -> anyhow::Result<String> {
        anyhow::bail!("API error 401 Unauthorized: No auth credentials found")
    }
}

fn settings_in(dir: &Path, mode: RelayMode) -> Settings {
    let mut settings = Settings::default();
    settings.server.mode = mode;
    settings.server.port = 0;
    settings.server.index_path = dir.join("index.html");
    settings.store.path = dir.join("chat_history.json");
    settings.session.secret = "integration-secret".to_string();
    settings
}

async fn router_for(settings: &Settings, client: Arc<dyn CompletionClient>) -> Router {
    WebServer::from_settings(settings, client)
        .await
        .unwrap()
        .router()
}

async fn post_chat(app: &Router, body: Value, cookie: Option<&str>) -> (StatusCode, Value, Option<String>) {
    post_raw(app, body.to_string(), cookie).await
}

async fn post_raw(app: &Router, body: String, cookie: Option<&str>) -> (StatusCode, Value, Option<String>) {
    let mut request = Request::builder()
        .method("POST")
        .uri("/chat")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        request = request.header(header::COOKIE, cookie);
    }

    let response = app
        .clone()
        .oneshot(request.body(Body::from(body)).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .map(|value| value.to_str().unwrap().to_string());
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json, set_cookie)
}

/// `name=value` part of a Set-Cookie header, ready to send back.
fn cookie_pair(set_cookie: &str) -> String {
    set_cookie.split(';').next().unwrap().to_string()
}

fn identifier_app_dir() -> (TempDir, Settings) {
    let dir = tempdir().unwrap();
    let settings = settings_in(dir.path(), RelayMode::Identifier);
    (dir, settings)
}

#[tokio::test]
async fn test_index_served_when_present() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "<h1>OpenSourceBuddy</h1>").unwrap();
    let settings = settings_in(dir.path(), RelayMode::Session);
    let app = router_for(&settings, Arc::new(ScriptedClient::default())).await;

    let response = app
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"<h1>OpenSourceBuddy</h1>");
}

#[tokio::test]
async fn test_missing_index_is_plain_text_500() {
    let dir = tempdir().unwrap();
    let settings = settings_in(dir.path(), RelayMode::Session);
    let app = router_for(&settings, Arc::new(ScriptedClient::default())).await;

    let response = app
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"index.html not found");
}

#[tokio::test]
async fn test_blank_and_malformed_requests_are_400() {
    let (_dir, settings) = identifier_app_dir();
    let client = Arc::new(ScriptedClient::default());
    let app = router_for(&settings, client.clone()).await;

    let (status, body, _) = post_chat(&app, json!({"message": "   "}), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No message provided");

    let (status, body, _) = post_raw(&app, "{oops".to_string(), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No JSON payload provided");

    let (status, _, _) = post_raw(&app, String::new(), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(client.call_count(), 0);
}

#[tokio::test]
async fn test_first_pr_scenario_with_identifier() {
    let (dir, settings) = identifier_app_dir();
    let client = Arc::new(ScriptedClient::default());
    let app = router_for(&settings, client.clone()).await;

    let (status, body, _) =
        post_chat(&app, json!({"message": "How do I make my first PR?"}), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"], "reply 1");
    let user_id = body["user_id"].as_str().unwrap().to_string();
    assert!(!user_id.is_empty());

    let (status, body, _) =
        post_chat(&app, json!({"message": "bye", "user_id": user_id}), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"], FAREWELL);
    assert_eq!(body["user_id"], user_id.as_str());
    assert_eq!(client.call_count(), 1);

    let stored: Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("chat_history.json")).unwrap())
            .unwrap();
    let history = stored[user_id.as_str()].as_array().unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history[0]["content"], PERSONA_PROMPT);
    assert_eq!(history[1]["content"], "How do I make my first PR?");
    assert_eq!(history[2], json!({"role": "assistant", "content": "reply 1"}));
}

#[tokio::test]
async fn test_generated_user_ids_are_distinct() {
    let (_dir, settings) = identifier_app_dir();
    let app = router_for(&settings, Arc::new(ScriptedClient::default())).await;

    let (_, first, _) = post_chat(&app, json!({"message": "hello"}), None).await;
    let (_, second, _) = post_chat(&app, json!({"message": "hello"}), None).await;

    assert_ne!(first["user_id"], second["user_id"]);
}

#[tokio::test]
async fn test_farewell_for_unseen_identifier_creates_nothing() {
    let (dir, settings) = identifier_app_dir();
    let client = Arc::new(ScriptedClient::default());
    let app = router_for(&settings, client.clone()).await;

    let (status, body, _) =
        post_chat(&app, json!({"message": "  QUIT ", "user_id": "stranger"}), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"response": FAREWELL, "user_id": "stranger"}));
    assert_eq!(client.call_count(), 0);
    assert!(!dir.path().join("chat_history.json").exists());
}

#[tokio::test]
async fn test_second_turn_carries_prior_context() {
    let (_dir, settings) = identifier_app_dir();
    let client = Arc::new(ScriptedClient::default());
    let app = router_for(&settings, client.clone()).await;

    post_chat(&app, json!({"message": "first", "user_id": "u1"}), None).await;
    post_chat(&app, json!({"message": "second", "user_id": "u1"}), None).await;

    let turn_two = client.call(1);
    assert_eq!(turn_two.len(), 4);
    assert_eq!(turn_two[0].role, Role::System);
    assert_eq!(turn_two[1], ChatMessage::user("first"));
    assert_eq!(turn_two[2], ChatMessage::assistant("reply 1"));
    assert_eq!(turn_two[3], ChatMessage::user("second"));
}

#[tokio::test]
async fn test_history_survives_restart() {
    let (_dir, settings) = identifier_app_dir();
    let app = router_for(&settings, Arc::new(ScriptedClient::default())).await;
    post_chat(&app, json!({"message": "remember me", "user_id": "u1"}), None).await;
    drop(app);

    let client = Arc::new(ScriptedClient::default());
    let app = router_for(&settings, client.clone()).await;
    post_chat(&app, json!({"message": "still there?", "user_id": "u1"}), None).await;

    let seen = client.call(0);
    assert_eq!(seen.len(), 4);
    assert_eq!(seen[1].content, "remember me");
}

#[tokio::test]
async fn test_upstream_failure_is_500_with_message() {
    let (_dir, settings) = identifier_app_dir();
    let app = router_for(&settings, Arc::new(BrokenClient)).await;

    let (status, body, _) = post_chat(&app, json!({"message": "hello"}), None).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("401"));
}

#[tokio::test]
async fn test_store_write_failure_is_500_and_not_remembered() {
    let (dir, settings) = identifier_app_dir();
    let client = Arc::new(ScriptedClient::default());
    let app = router_for(&settings, client.clone()).await;

    // A directory where the history file belongs makes every write fail.
    std::fs::create_dir(dir.path().join("chat_history.json")).unwrap();

    let (status, body, _) =
        post_chat(&app, json!({"message": "hello", "user_id": "u1"}), None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("history file"));
    assert_eq!(client.call_count(), 0);

    std::fs::remove_dir(dir.path().join("chat_history.json")).unwrap();
    post_chat(&app, json!({"message": "hello again", "user_id": "u1"}), None).await;

    let seen = client.call(0);
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[1], ChatMessage::user("hello again"));
}

#[tokio::test]
async fn test_session_cookie_carries_history() {
    let dir = tempdir().unwrap();
    let settings = settings_in(dir.path(), RelayMode::Session);
    let client = Arc::new(ScriptedClient::default());
    let app = router_for(&settings, client.clone()).await;

    let (status, body, set_cookie) = post_chat(&app, json!({"message": "first"}), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"response": "reply 1"}));
    let set_cookie = set_cookie.unwrap();
    assert!(set_cookie.contains("Max-Age=7200"));
    let cookie = cookie_pair(&set_cookie);

    post_chat(&app, json!({"message": "second"}), Some(&cookie)).await;
    assert_eq!(client.call(1).len(), 4);

    // A different browser gets its own history.
    post_chat(&app, json!({"message": "elsewhere"}), None).await;
    assert_eq!(client.call(2).len(), 2);
}

#[tokio::test]
async fn test_session_farewell_clears_history() {
    let dir = tempdir().unwrap();
    let settings = settings_in(dir.path(), RelayMode::Session);
    let client = Arc::new(ScriptedClient::default());
    let app = router_for(&settings, client.clone()).await;

    let (_, _, set_cookie) = post_chat(&app, json!({"message": "first"}), None).await;
    let cookie = cookie_pair(&set_cookie.unwrap());

    let (status, body, expired) = post_chat(&app, json!({"message": "Bye"}), Some(&cookie)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"response": FAREWELL}));
    assert!(expired.unwrap().contains("Max-Age=0"));
    assert_eq!(client.call_count(), 1);

    post_chat(&app, json!({"message": "again"}), Some(&cookie)).await;
    let fresh = client.call(1);
    assert_eq!(fresh.len(), 2);
    assert_eq!(fresh[0].content, PERSONA_PROMPT);
}

#[tokio::test]
async fn test_forged_session_cookie_starts_fresh() {
    let dir = tempdir().unwrap();
    let settings = settings_in(dir.path(), RelayMode::Session);
    let client = Arc::new(ScriptedClient::default());
    let app = router_for(&settings, client.clone()).await;

    let (_, _, set_cookie) = post_chat(&app, json!({"message": "secret stuff"}), None).await;
    let cookie = cookie_pair(&set_cookie.unwrap());
    let forged = format!("{}tampered", cookie);

    post_chat(&app, json!({"message": "show me"}), Some(&forged)).await;
    assert_eq!(client.call(1).len(), 2);
}

#[tokio::test]
async fn test_relay_against_mock_completion_api() {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "Start with a good first issue."}}]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (_dir, mut settings) = identifier_app_dir();
    settings.llm.base_url = mock_server.uri();
    let client = Arc::new(LLMClient::new("test-key".to_string(), settings.llm.clone()));
    let app = router_for(&settings, client).await;

    let (status, body, _) =
        post_chat(&app, json!({"message": "How do I make my first PR?"}), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"], "Start with a good first issue.");
}
