//! Wire types for `POST /chat`

use serde::Serialize;
use serde_json::Value;

use super::error::AppError;

pub const NO_PAYLOAD: &str = "No JSON payload provided";
pub const NO_MESSAGE: &str = "No message provided";

/// A validated chat request: `message` is trimmed and non-empty, a blank
/// `user_id` is treated as absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub message: String,
    pub user_id: Option<String>,
}

impl ChatRequest {
    pub fn parse(body: &[u8]) -> Result<Self, AppError> {
        let payload: Value =
            serde_json::from_slice(body).map_err(|_| AppError::bad_request(NO_PAYLOAD))?;

        let fields = match payload.as_object() {
            Some(fields) if !fields.is_empty() => fields,
            _ => return Err(AppError::bad_request(NO_PAYLOAD)),
        };

        let message = fields
            .get("message")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|message| !message.is_empty())
            .ok_or_else(|| AppError::bad_request(NO_MESSAGE))?;

        let user_id = match fields.get("user_id") {
            None | Some(Value::Null) => None,
            Some(Value::String(id)) if id.trim().is_empty() => None,
            Some(Value::String(id)) => Some(id.clone()),
            Some(_) => return Err(AppError::bad_request("user_id must be a string")),
        };

        Ok(Self {
            message: message.to_string(),
            user_id,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}
