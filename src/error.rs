use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::content::ContentError;

#[derive(Debug, Error, Clone)]
pub enum ServiceError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Rate limit exceeded. Please try again later.")]
    RateLimited { retry_after_secs: u64 },
    #[error("upstream request failed: {0}")]
    Upstream(String),
    #[error("{0}")]
    Unavailable(String),
    #[error("{0}")]
    Internal(String),
}

impl ServiceError {
    pub fn status_code(&self) -> u16 {
        match self {
            Self::BadRequest(_) => 400,
            Self::Forbidden(_) => 403,
            Self::NotFound(_) => 404,
            Self::RateLimited { .. } => 429,
            Self::Upstream(_) | Self::Unavailable(_) | Self::Internal(_) => 500,
        }
    }

    pub fn database_unavailable() -> Self {
        Self::Unavailable("Database not available".to_string())
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        Self::Internal(format!("database error: {err}"))
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        Self::Upstream(err.to_string())
    }
}

impl From<ContentError> for ServiceError {
    fn from(err: ContentError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        match self {
            Self::RateLimited { retry_after_secs } => {
                let body = json!({
                    "error": self.to_string(),
                    "retryAfter": retry_after_secs,
                });
                let mut response = (status, Json(body)).into_response();
                if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                    response.headers_mut().insert(header::RETRY_AFTER, value);
                }
                response
            }
            other => (status, Json(json!({ "error": other.to_string() }))).into_response(),
        }
    }
}

/// Logs `err` and answers with the route's public failure message, keeping
/// client errors (4xx) and unavailable services as they are.
pub fn failure(context: &str, err: ServiceError) -> ServiceError {
    if let ServiceError::Unavailable(message) = &err {
        tracing::warn!("{context}: {message}");
        return err;
    }
    if err.status_code() >= 500 {
        tracing::error!("{context}: {err}");
        ServiceError::Internal(context.to_string())
    } else {
        err
    }
}

/// Like [`failure`], but keeps the underlying message as `details`.
pub fn failure_with_details(context: &str, err: ServiceError) -> Response {
    if err.status_code() >= 500 {
        tracing::error!("{context}: {err}");
        let body = json!({ "error": context, "details": err.to_string() });
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    } else {
        err.into_response()
    }
}
