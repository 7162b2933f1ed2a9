//! Rate limiter errors

use thiserror::Error;

/// Result type for rate limiter construction
pub type RateLimitResult<T> = Result<T, RateLimitError>;

/// Invalid rate limit configuration
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RateLimitError {
    #[error("rate limit '{0}': limit must be greater than zero")]
    ZeroLimit(String),

    #[error("rate limit '{0}': window must be greater than zero")]
    ZeroWindow(String),

    #[error("rate limit scope must not be empty")]
    EmptyScope,
}

impl RateLimitError {
    pub fn code(&self) -> &'static str {
        match self {
            RateLimitError::ZeroLimit(_) => "RATE_LIMIT_ZERO_LIMIT",
            RateLimitError::ZeroWindow(_) => "RATE_LIMIT_ZERO_WINDOW",
            RateLimitError::EmptyScope => "RATE_LIMIT_EMPTY_SCOPE",
        }
    }
}
