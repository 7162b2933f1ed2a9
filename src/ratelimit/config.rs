//! Rate limit configurations and presets

use std::borrow::Cow;

use chrono::Duration;

use super::errors::{RateLimitError, RateLimitResult};

/// Interval between sweeps of expired entries
pub const DEFAULT_SWEEP_INTERVAL_MS: u64 = 300_000;

/// Limit and fixed window for one scope.
///
/// The scope namespaces the counters, so two configs with different scopes
/// never share a budget for the same client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    scope: Cow<'static, str>,
    limit: u32,
    window_ms: u64,
}

impl RateLimitConfig {
    /// 5 requests per 10 seconds
    pub const STRICT: Self = Self::preset("strict", 5, 10_000);
    /// 10 requests per 10 seconds
    pub const STANDARD: Self = Self::preset("standard", 10, 10_000);
    /// 30 requests per minute
    pub const RELAXED: Self = Self::preset("relaxed", 30, 60_000);
    /// 5 login attempts per 15 minutes
    pub const AUTH: Self = Self::preset("auth", 5, 900_000);
    /// 3 submissions per hour
    pub const PUBLIC_FORM: Self = Self::preset("public_form", 3, 3_600_000);

    const fn preset(scope: &'static str, limit: u32, window_ms: u64) -> Self {
        Self {
            scope: Cow::Borrowed(scope),
            limit,
            window_ms,
        }
    }

    /// Builds a custom configuration.
    ///
    /// # Errors
    ///
    /// Rejects an empty scope, a zero limit and a zero window.
    pub fn new(scope: impl Into<String>, limit: u32, window_ms: u64) -> RateLimitResult<Self> {
        let scope = scope.into();
        if scope.is_empty() {
            return Err(RateLimitError::EmptyScope);
        }
        if limit == 0 {
            return Err(RateLimitError::ZeroLimit(scope));
        }
        if window_ms == 0 {
            return Err(RateLimitError::ZeroWindow(scope));
        }
        Ok(Self {
            scope: Cow::Owned(scope),
            limit,
            window_ms,
        })
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn window_ms(&self) -> u64 {
        self.window_ms
    }

    pub fn window(&self) -> Duration {
        Duration::milliseconds(i64::try_from(self.window_ms).unwrap_or(i64::MAX))
    }

    /// Counter key for a client under this scope
    pub(crate) fn key_for(&self, identifier: &str) -> String {
        format!("{}:{}", self.scope, identifier)
    }
}
