//! # Auth Errors
//!
//! Error types for admin authentication.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

/// Result type for auth operations
pub type AuthResult<T> = Result<T, AuthError>;

/// Authentication errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    // ==================
    // Authentication Errors
    // ==================

    /// Unknown email or wrong password (generic - don't leak which)
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Email already registered
    #[error("Email already registered")]
    EmailAlreadyExists,

    // ==================
    // Token Errors
    // ==================

    /// No `Authorization: Bearer` header
    #[error("Missing bearer token")]
    MissingToken,

    /// JWT token is malformed
    #[error("Malformed token")]
    MalformedToken,

    /// JWT token has expired
    #[error("Token expired")]
    TokenExpired,

    /// JWT signature is invalid
    #[error("Invalid token signature")]
    InvalidSignature,

    // ==================
    // Internal Errors
    // ==================

    /// Password hashing failed
    #[error("Internal error: password hashing failed")]
    HashingFailed,

    /// Token generation failed
    #[error("Internal error: token generation failed")]
    TokenGenerationFailed,

    /// Storage operation failed
    #[error("Storage error: {0}")]
    StorageError(String),
}

impl AuthError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            // 401 Unauthorized
            AuthError::InvalidCredentials => 401,
            AuthError::MissingToken => 401,
            AuthError::MalformedToken => 401,
            AuthError::TokenExpired => 401,
            AuthError::InvalidSignature => 401,

            // 409 Conflict
            AuthError::EmailAlreadyExists => 409,

            // 500 Internal Server Error
            AuthError::HashingFailed => 500,
            AuthError::TokenGenerationFailed => 500,
            AuthError::StorageError(_) => 500,
        }
    }

    /// Returns whether this error should be logged at warn level
    pub fn is_client_error(&self) -> bool {
        self.status_code() < 500
    }
}

// ==================
// HTTP Error Conversion
// ==================

impl IntoResponse for AuthError {
    fn into_response(self) -> axum::response::Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        // Callers learn that they failed, never why
        let message = match status {
            StatusCode::UNAUTHORIZED => "Unauthorized".to_string(),
            StatusCode::INTERNAL_SERVER_ERROR => "Internal Server Error".to_string(),
            _ => self.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
