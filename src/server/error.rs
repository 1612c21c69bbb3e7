use crate::audio::AudioError;
use crate::composer::ComposeError;
use crate::usage::UsageStatus;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Failures surfaced to HTTP clients. Every variant renders as a JSON body
/// with at least an `error` field.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Compose(#[from] ComposeError),

    #[error("{0}")]
    BadRequest(String),

    #[error("Usage limit reached")]
    UsageExhausted(UsageStatus),

    #[error(transparent)]
    Audio(#[from] AudioError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Compose(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::UsageExhausted(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Audio(AudioError::NotConfigured(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Audio(AudioError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Audio(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            ApiError::UsageExhausted(usage) => json!({
                "error": self.to_string(),
                "remaining": usage.remaining,
                "used": usage.used,
                "max_uses": usage.max_uses,
                "resets_in_seconds": usage.resets_in_seconds,
            }),
            ApiError::Audio(AudioError::Upstream {
                status: upstream_status,
                detail,
            }) => json!({
                "error": self.to_string(),
                "upstream_status": upstream_status,
                "detail": detail,
            }),
            _ => json!({ "error": self.to_string() }),
        };

        if status.is_server_error() {
            error!("Request failed with {}: {}", status, self);
        }

        (status, Json(body)).into_response()
    }
}
