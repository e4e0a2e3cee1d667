use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::ports::StoreError;
use crate::services::pipeline::PipelineError;
use crate::services::queue::QueueError;

/// Errors surfaced by HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Missing or invalid credentials")]
    Unauthorized,

    #[error("Song not found")]
    NotFound,

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Music service unavailable: {0}")]
    Upstream(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::NotFound(_) => ApiError::NotFound,
            PipelineError::Store(e) => ApiError::Store(e),
            PipelineError::Audio(e) => ApiError::Upstream(e.to_string()),
            PipelineError::Task(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<garde::Report> for ApiError {
    fn from(report: garde::Report) -> Self {
        ApiError::Validation(report.to_string())
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Queue(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Store(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            ApiError::Unauthorized | ApiError::NotFound | ApiError::Validation(_) => self.to_string(),
            ApiError::Upstream(_) => "Music service unavailable, try again later".to_string(),
            _ => {
                tracing::error!(error = %self, "Request failed");
                "Internal server error".to_string()
            }
        };
        if matches!(self, ApiError::Upstream(_)) {
            tracing::warn!(error = %self, "Upstream call failed");
        }

        (status, Json(json!({ "error": message }))).into_response()
    }
}
