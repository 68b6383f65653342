//! API error type and its HTTP mapping.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use waypoint_core::{GeoError, PayloadError, ReconcileError, SignatureError};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("invalid webhook signature: {0}")]
    Signature(#[from] SignatureError),
    #[error("authorization required")]
    Unauthorized,
    #[error("invalid admin token")]
    Forbidden,
    #[error("{0}")]
    NotFound(String),
    /// Store unavailable or write conflict; the caller should retry
    #[error("temporarily unavailable: {0}")]
    Unavailable(String),
    #[error("upstream provider error: {0}")]
    Upstream(String),
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<GeoError> for ApiError {
    fn from(err: GeoError) -> Self {
        ApiError::Validation(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<PayloadError> for ApiError {
    fn from(err: PayloadError) -> Self {
        ApiError::Validation(err.to_string())
    }
}

impl From<ReconcileError> for ApiError {
    fn from(err: ReconcileError) -> Self {
        match err {
            ReconcileError::NotFound(user_id) => {
                ApiError::NotFound(format!("user {} not found", user_id))
            }
            ReconcileError::Persistence(err) => ApiError::Unavailable(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Validation(_) | ApiError::Signature(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }

        let message = match &self {
            ApiError::Internal(_) => "internal error".to_string(),
            other => other.to_string(),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
