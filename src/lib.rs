//! OpenSourceBuddy - chat relay with per-user conversation history
//!
//! Forwards chat messages to an OpenAI-compatible completion API and keeps
//! each user's history, either behind a signed session cookie or keyed by
//! an explicit `user_id` and persisted to a JSON file.

pub mod cli;
pub mod config;
pub mod core;
pub mod relay;
pub mod session;
pub mod storage;
pub mod utils;
pub mod web;

pub use config::{RelayMode, Settings};
pub use core::{ChatMessage, CompletionClient, History, LLMClient, Role};
pub use relay::ChatRelay;
pub use web::WebServer;
