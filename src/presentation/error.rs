// Maps domain errors onto HTTP responses
use crate::domain::error::DashboardError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Dashboard(#[from] DashboardError),

    #[error("session not found: {0}")]
    SessionNotFound(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Dashboard(err) => match err {
                DashboardError::NotFound { .. } => StatusCode::NOT_FOUND,
                DashboardError::DuplicateId { .. } | DashboardError::InvalidTransition { .. } => {
                    StatusCode::CONFLICT
                }
                DashboardError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
                DashboardError::Persistence(_) => StatusCode::BAD_GATEWAY,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{}", self);
        } else {
            tracing::debug!("Rejected request: {}", self);
        }
        let retryable = matches!(&self, ApiError::Dashboard(err) if err.is_recoverable());
        (status, Json(json!({ "error": self.to_string(), "retryable": retryable }))).into_response()
    }
}
