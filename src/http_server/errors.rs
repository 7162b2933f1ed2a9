//! Server startup errors
//!
//! Everything here is fatal: the server refuses to start.

use thiserror::Error;

use crate::auth::AuthError;
use crate::schema::SchemaError;

pub type ServerResult<T> = Result<T, ServerError>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    ConfigParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid value for {var}: {value:?}")]
    InvalidEnv { var: &'static str, value: String },

    #[error("invalid socket address: {0}")]
    InvalidAddress(String),

    #[error("schema setup failed: {0}")]
    Schema(#[from] SchemaError),

    #[error("admin setup failed: {0}")]
    Auth(#[from] AuthError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
