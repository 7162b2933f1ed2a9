//! Background removal of expired counters

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::limiter::RateLimiter;

/// Spawns a task that sweeps `limiter` every `every`.
///
/// Sweeping only drops entries whose window already ended, so it never
/// changes the outcome of a later check. Abort the handle to stop it.
pub fn spawn_sweeper(limiter: Arc<dyn RateLimiter>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(every);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick fires immediately
        timer.tick().await;

        loop {
            timer.tick().await;
            let removed = limiter.sweep_at(Utc::now());
            if removed > 0 {
                tracing::debug!(removed, remaining = limiter.tracked(), "swept rate limit entries");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::{InMemoryRateLimiter, RateLimitConfig};

    #[tokio::test]
    async fn test_sweeper_removes_expired_entries() {
        let limiter = Arc::new(InMemoryRateLimiter::new());
        let config = RateLimitConfig::new("tiny", 1, 1).unwrap();
        limiter.check_at("a", &config, Utc::now() - chrono::Duration::seconds(5));
        assert_eq!(limiter.tracked(), 1);

        let handle = spawn_sweeper(limiter.clone(), Duration::from_millis(10));
        for _ in 0..100 {
            if limiter.tracked() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        handle.abort();

        assert_eq!(limiter.tracked(), 0);
    }
}
