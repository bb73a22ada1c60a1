use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};

use super::protocol::ErrorBody;

/// Failures surfaced at the HTTP boundary.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("index.html not found")]
    IndexNotFound(#[source] std::io::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        AppError::BadRequest(message.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::BadRequest(message) => {
                tracing::debug!("[web] Rejected request: {}", message);
                (StatusCode::BAD_REQUEST, Json(ErrorBody { error: message })).into_response()
            }
            AppError::IndexNotFound(source) => {
                tracing::error!("[web] Failed to read landing page: {:?}", source);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "index.html not found".to_string(),
                )
                    .into_response()
            }
            AppError::Internal(err) => {
                tracing::error!("[web] Request failed: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorBody {
                        error: format!("{:#}", err),
                    }),
                )
                    .into_response()
            }
        }
    }
}
