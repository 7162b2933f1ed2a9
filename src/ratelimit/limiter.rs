//! Fixed-window counters
//!
//! Each (scope, client) pair owns one entry `{count, reset_at}`. The window
//! starts at the first request and is never extended by later ones. An entry
//! whose `reset_at` lies strictly before `now` is expired and replaced on the
//! next request.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};

use super::config::RateLimitConfig;

/// Outcome of one rate limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub admitted: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
}

impl RateLimitDecision {
    /// Whole seconds until the window resets, rounded up
    pub fn retry_after_secs(&self, now: DateTime<Utc>) -> u64 {
        let ms = (self.reset_at - now).num_milliseconds();
        if ms <= 0 {
            0
        } else {
            (ms as u64).div_ceil(1000)
        }
    }

    /// Reset instant as Unix milliseconds
    pub fn reset_millis(&self) -> i64 {
        self.reset_at.timestamp_millis()
    }
}

/// Counter store consulted by the admission gate.
///
/// Implementations must make check-and-increment atomic per key.
pub trait RateLimiter: Send + Sync {
    /// Counts one request from `identifier` against `config` at `now`.
    fn check_at(
        &self,
        identifier: &str,
        config: &RateLimitConfig,
        now: DateTime<Utc>,
    ) -> RateLimitDecision;

    fn check(&self, identifier: &str, config: &RateLimitConfig) -> RateLimitDecision {
        self.check_at(identifier, config, Utc::now())
    }

    /// Drops every entry whose window ended before `now`. Returns how many
    /// were removed.
    fn sweep_at(&self, now: DateTime<Utc>) -> usize;

    /// Number of live or not yet swept entries
    fn tracked(&self) -> usize;
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    count: u32,
    reset_at: DateTime<Utc>,
}

/// Process-local limiter. Counters vanish on restart and are not shared
/// between instances.
#[derive(Debug, Default)]
pub struct InMemoryRateLimiter {
    entries: Mutex<HashMap<String, Entry>>,
}

impl InMemoryRateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave an entry half-written,
    // so the map is still consistent.
    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RateLimiter for InMemoryRateLimiter {
    fn check_at(
        &self,
        identifier: &str,
        config: &RateLimitConfig,
        now: DateTime<Utc>,
    ) -> RateLimitDecision {
        let fresh = Entry {
            count: 0,
            reset_at: now
                .checked_add_signed(config.window())
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        };

        let mut entries = self.entries();
        let entry = entries.entry(config.key_for(identifier)).or_insert(fresh);
        if entry.reset_at < now {
            *entry = fresh;
        }

        if entry.count >= config.limit() {
            return RateLimitDecision {
                admitted: false,
                limit: config.limit(),
                remaining: 0,
                reset_at: entry.reset_at,
            };
        }

        entry.count += 1;
        RateLimitDecision {
            admitted: true,
            limit: config.limit(),
            remaining: config.limit() - entry.count,
            reset_at: entry.reset_at,
        }
    }

    fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|_, entry| entry.reset_at >= now);
        before - entries.len()
    }

    fn tracked(&self) -> usize {
        self.entries().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::sync::Arc;

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn config(limit: u32, window_ms: u64) -> RateLimitConfig {
        RateLimitConfig::new("test", limit, window_ms).unwrap()
    }

    #[test]
    fn test_first_request_opens_window() {
        let limiter = InMemoryRateLimiter::new();
        let decision = limiter.check_at("a", &config(3, 1000), t0());
        assert!(decision.admitted);
        assert_eq!(decision.remaining, 2);
        assert_eq!(decision.limit, 3);
        assert_eq!(decision.reset_at, t0() + Duration::milliseconds(1000));
    }

    #[test]
    fn test_limit_then_reject() {
        let limiter = InMemoryRateLimiter::new();
        let cfg = config(3, 60_000);

        let remaining: Vec<u32> = (0..3)
            .map(|i| limiter.check_at("a", &cfg, t0() + Duration::seconds(i)))
            .map(|d| {
                assert!(d.admitted);
                d.remaining
            })
            .collect();
        assert_eq!(remaining, vec![2, 1, 0]);

        let rejected = limiter.check_at("a", &cfg, t0() + Duration::seconds(10));
        assert!(!rejected.admitted);
        assert_eq!(rejected.remaining, 0);
        assert_eq!(rejected.reset_at, t0() + Duration::seconds(60));
    }

    #[test]
    fn test_rejections_do_not_extend_window() {
        let limiter = InMemoryRateLimiter::new();
        let cfg = config(1, 1000);
        limiter.check_at("a", &cfg, t0());
        for ms in [100, 500, 999, 1000] {
            let d = limiter.check_at("a", &cfg, t0() + Duration::milliseconds(ms));
            assert!(!d.admitted, "rejected at +{}ms", ms);
            assert_eq!(d.reset_at, t0() + Duration::milliseconds(1000));
        }
        // Strictly after reset_at the window starts over
        let d = limiter.check_at("a", &cfg, t0() + Duration::milliseconds(1001));
        assert!(d.admitted);
        assert_eq!(d.remaining, 0);
        assert_eq!(d.reset_at, t0() + Duration::milliseconds(2001));
    }

    #[test]
    fn test_clients_are_independent() {
        let limiter = InMemoryRateLimiter::new();
        let cfg = config(1, 1000);
        assert!(limiter.check_at("a", &cfg, t0()).admitted);
        assert!(limiter.check_at("b", &cfg, t0()).admitted);
        assert!(!limiter.check_at("a", &cfg, t0()).admitted);
    }

    #[test]
    fn test_scopes_are_independent() {
        let limiter = InMemoryRateLimiter::new();
        let login = RateLimitConfig::new("login", 1, 1000).unwrap();
        let form = RateLimitConfig::new("form", 1, 1000).unwrap();
        assert!(limiter.check_at("a", &login, t0()).admitted);
        assert!(limiter.check_at("a", &form, t0()).admitted);
        assert!(!limiter.check_at("a", &login, t0()).admitted);
        assert_eq!(limiter.tracked(), 2);
    }

    #[test]
    fn test_sweep_removes_only_expired() {
        let limiter = InMemoryRateLimiter::new();
        limiter.check_at("old", &config(5, 1000), t0());
        limiter.check_at("new", &config(5, 1000), t0() + Duration::seconds(5));

        assert_eq!(limiter.sweep_at(t0() + Duration::milliseconds(1000)), 0);
        assert_eq!(limiter.sweep_at(t0() + Duration::seconds(3)), 1);
        assert_eq!(limiter.tracked(), 1);

        // The surviving entry keeps its count
        let d = limiter.check_at("new", &config(5, 1000), t0() + Duration::seconds(5));
        assert_eq!(d.remaining, 3);
    }

    #[test]
    fn test_sweep_is_transparent() {
        let cfg = config(2, 1000);
        let swept = InMemoryRateLimiter::new();
        let kept = InMemoryRateLimiter::new();
        for limiter in [&swept, &kept] {
            limiter.check_at("a", &cfg, t0());
            limiter.check_at("a", &cfg, t0());
        }
        let later = t0() + Duration::seconds(2);
        swept.sweep_at(later);
        assert_eq!(swept.check_at("a", &cfg, later), kept.check_at("a", &cfg, later));
    }

    #[test]
    fn test_retry_after_rounds_up() {
        let decision = RateLimitDecision {
            admitted: false,
            limit: 1,
            remaining: 0,
            reset_at: t0() + Duration::milliseconds(1500),
        };
        assert_eq!(decision.retry_after_secs(t0()), 2);
        assert_eq!(decision.retry_after_secs(t0() + Duration::milliseconds(1500)), 0);
        assert_eq!(decision.retry_after_secs(t0() + Duration::seconds(9)), 0);
        assert_eq!(decision.reset_millis(), t0().timestamp_millis() + 1500);
    }

    #[test]
    fn test_concurrent_checks_never_exceed_limit() {
        let limiter = Arc::new(InMemoryRateLimiter::new());
        let cfg = config(10, 60_000);
        let now = t0();

        let handles: Vec<_> = (0..50)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                let cfg = cfg.clone();
                std::thread::spawn(move || limiter.check_at("shared", &cfg, now).admitted)
            })
            .collect();

        let admitted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|admitted| *admitted)
            .count();
        assert_eq!(admitted, 10);
    }
}
