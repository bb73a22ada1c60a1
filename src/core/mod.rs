//! Conversation primitives and the upstream completion boundary

pub mod history;
pub mod llm;
pub mod persona;

pub use history::History;
pub use llm::{ChatMessage, CompletionClient, LLMClient, Role};
