//! Fixed-window rate limiting
//!
//! Guards unauthenticated endpoints. Counters live in one process; with
//! several instances each keeps its own, so the effective limit becomes
//! `limit × instances`. A distributed store would implement `RateLimiter`.

mod client;
mod config;
mod errors;
mod limiter;
mod sweeper;

pub use client::{
    client_identifier, ForwardedHeaderPolicy, FALLBACK_IDENTIFIER, X_FORWARDED_FOR, X_REAL_IP,
};
pub use config::{RateLimitConfig, DEFAULT_SWEEP_INTERVAL_MS};
pub use errors::{RateLimitError, RateLimitResult};
pub use limiter::{InMemoryRateLimiter, RateLimitDecision, RateLimiter};
pub use sweeper::spawn_sweeper;
