//! # Data Store Errors
//!
//! Downstream failures and how they reach the client. Codes follow the
//! PostgreSQL / PostgREST codes a hosted backend reports.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Result type for data store operations
pub type DataResult<T> = Result<T, DataError>;

/// unique_violation
pub const PG_UNIQUE_VIOLATION: &str = "23505";
/// foreign_key_violation
pub const PG_FOREIGN_KEY_VIOLATION: &str = "23503";
/// check_violation
pub const PG_CHECK_VIOLATION: &str = "23514";
/// `.single()` matched no row
pub const PGRST_NO_ROWS: &str = "PGRST116";

/// Data store errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DataError {
    /// A unique column already holds this value
    #[error("duplicate value for {table}.{column}")]
    Duplicate { table: String, column: String },

    #[error("foreign key violation: {0}")]
    ForeignKey(String),

    #[error("check constraint violated: {0}")]
    CheckViolation(String),

    /// No row matched
    #[error("row not found")]
    NotFound,

    #[error("unknown table: {0}")]
    UnknownTable(String),

    /// Any other backend failure, with the backend's own code
    #[error("database error {code}: {message}")]
    Database { code: String, message: String },

    #[error("internal error: {0}")]
    Internal(String),
}

impl DataError {
    /// Map a backend error code to its variant
    pub fn from_code(code: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        match code {
            PG_UNIQUE_VIOLATION => DataError::Duplicate {
                table: String::new(),
                column: message,
            },
            PG_FOREIGN_KEY_VIOLATION => DataError::ForeignKey(message),
            PG_CHECK_VIOLATION => DataError::CheckViolation(message),
            PGRST_NO_ROWS => DataError::NotFound,
            _ => DataError::Database {
                code: code.to_string(),
                message,
            },
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            DataError::Duplicate { .. } => StatusCode::CONFLICT,
            DataError::ForeignKey(_) => StatusCode::BAD_REQUEST,
            DataError::CheckViolation(_) => StatusCode::BAD_REQUEST,
            DataError::NotFound => StatusCode::NOT_FOUND,
            DataError::UnknownTable(_) => StatusCode::INTERNAL_SERVER_ERROR,
            DataError::Database { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            DataError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable code sent to the client
    pub fn code(&self) -> &str {
        match self {
            DataError::Duplicate { .. } => "DUPLICATE_ERROR",
            DataError::ForeignKey(_) => "FOREIGN_KEY_ERROR",
            DataError::CheckViolation(_) => "CHECK_VIOLATION",
            DataError::NotFound => "NOT_FOUND",
            DataError::UnknownTable(_) => "UNKNOWN_TABLE",
            DataError::Database { code, .. } => code,
            DataError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Message sent to the client. Backend details stay in the logs.
    pub fn public_message(&self) -> &'static str {
        match self {
            DataError::Duplicate { .. } => "This record already exists",
            DataError::ForeignKey(_) => "A related record was not found",
            DataError::CheckViolation(_) => "The input violates a data constraint",
            DataError::NotFound => "Record not found",
            _ => "A database error occurred",
        }
    }
}

impl IntoResponse for DataError {
    fn into_response(self) -> Response {
        if self.status_code().is_server_error() {
            tracing::error!(error = %self, "data store failure");
        }
        let body = json!({ "error": self.public_message(), "code": self.code() });
        (self.status_code(), Json(body)).into_response()
    }
}
