use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::services::WagerError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation failed")]
    Validation(Vec<String>),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Timed out")]
    Timeout,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorPayload,
}

/// One message for request-level failures, the full list for field
/// validation.
#[derive(Serialize)]
#[serde(untagged)]
enum ErrorPayload {
    One(String),
    Many(Vec<String>),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, payload) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorPayload::One(msg)),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ErrorPayload::One(msg)),
            AppError::Validation(messages) => {
                (StatusCode::BAD_REQUEST, ErrorPayload::Many(messages))
            }
            AppError::Conflict(msg) => (StatusCode::CONFLICT, ErrorPayload::One(msg)),
            AppError::Timeout => (
                StatusCode::GATEWAY_TIMEOUT,
                ErrorPayload::One("purchase timed out".into()),
            ),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorPayload::One("Internal server error".into()),
                )
            }
        };

        (status, Json(ErrorBody { error: payload })).into_response()
    }
}

impl From<WagerError> for AppError {
    fn from(err: WagerError) -> Self {
        match err {
            WagerError::Validation(msg) => AppError::BadRequest(msg),
            WagerError::NotFound(id) => AppError::NotFound(format!("wager {id} not found")),
            e @ WagerError::InsufficientInventory { .. } => AppError::BadRequest(e.to_string()),
            e @ WagerError::Contention { .. } => AppError::Conflict(e.to_string()),
            WagerError::Timeout => AppError::Timeout,
            WagerError::Store(e) => AppError::Internal(e.into()),
        }
    }
}
