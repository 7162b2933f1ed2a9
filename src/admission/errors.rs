//! # Admission Errors
//!
//! Every way a request can be turned away, and the HTTP response for each.

use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde_json::json;
use thiserror::Error;

use crate::auth::AuthError;
use crate::schema::FieldErrors;
use crate::store::DataError;

/// Result type for admitted requests
pub type AdmissionResult<T> = Result<T, AdmissionError>;

pub const X_RATELIMIT_LIMIT: &str = "x-ratelimit-limit";
pub const X_RATELIMIT_REMAINING: &str = "x-ratelimit-remaining";
pub const X_RATELIMIT_RESET: &str = "x-ratelimit-reset";

/// Request admission errors
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AdmissionError {
    /// Caller is not a signed-in admin. Carries no reason on purpose.
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Too many requests. Please try again later.")]
    RateLimited {
        limit: u32,
        remaining: u32,
        reset_at: DateTime<Utc>,
        /// Whole seconds until `reset_at`
        retry_after: u64,
    },

    /// Body is not JSON
    #[error("Invalid request body")]
    InvalidBody,

    #[error("Validation Error")]
    Validation(FieldErrors),

    /// The data layer refused the admitted request
    #[error(transparent)]
    Downstream(#[from] DataError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AdmissionError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AdmissionError::Unauthorized => StatusCode::UNAUTHORIZED,
            AdmissionError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AdmissionError::InvalidBody => StatusCode::BAD_REQUEST,
            AdmissionError::Validation(_) => StatusCode::BAD_REQUEST,
            AdmissionError::Downstream(e) => e.status_code(),
            AdmissionError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<AuthError> for AdmissionError {
    fn from(err: AuthError) -> Self {
        if err.is_client_error() {
            AdmissionError::Unauthorized
        } else {
            AdmissionError::Internal(err.to_string())
        }
    }
}

fn header(value: impl ToString) -> Option<HeaderValue> {
    HeaderValue::from_str(&value.to_string()).ok()
}

impl IntoResponse for AdmissionError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match self {
            AdmissionError::Unauthorized | AdmissionError::InvalidBody => {
                (status, Json(json!({ "error": self.to_string() }))).into_response()
            }
            AdmissionError::RateLimited {
                limit,
                remaining,
                reset_at,
                retry_after,
            } => {
                let mut headers = HeaderMap::new();
                let pairs = [
                    (HeaderName::from_static(X_RATELIMIT_LIMIT), header(limit)),
                    (HeaderName::from_static(X_RATELIMIT_REMAINING), header(remaining)),
                    (
                        HeaderName::from_static(X_RATELIMIT_RESET),
                        header(reset_at.timestamp_millis()),
                    ),
                    (axum::http::header::RETRY_AFTER, header(retry_after)),
                ];
                for (name, value) in pairs {
                    if let Some(value) = value {
                        headers.insert(name, value);
                    }
                }
                let body = json!({
                    "error": "Too many requests. Please try again later.",
                    "retryAfter": retry_after,
                });
                (status, headers, Json(body)).into_response()
            }
            AdmissionError::Validation(details) => (
                status,
                Json(json!({ "error": "Validation Error", "details": details })),
            )
                .into_response(),
            AdmissionError::Downstream(err) => err.into_response(),
            AdmissionError::Internal(message) => {
                tracing::error!(error = %message, "request failed");
                (status, Json(json!({ "error": "Internal Server Error" }))).into_response()
            }
        }
    }
}
