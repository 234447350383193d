//! RateLimitService — explicit fixed-window counters keyed by
//! (scope, client). Advisory: the window resets at its boundary rather than
//! sliding, and counting is not atomic across processes.

use crate::errors::AppError;
use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};
use thiserror::Error;
use tokio::sync::Mutex;

/// A named limit: at most `limit` hits per `window` per client.
#[derive(Debug, Clone, Copy)]
pub struct RateScope {
    pub name: &'static str,
    pub limit: u32,
    pub window: Duration,
}

pub const DOWNLOADS: RateScope = RateScope {
    name: "download",
    limit: 10,
    window: Duration::from_secs(3600),
};
pub const LIKES: RateScope = RateScope {
    name: "like",
    limit: 60,
    window: Duration::from_secs(3600),
};
pub const COMMENTS: RateScope = RateScope {
    name: "comment",
    limit: 10,
    window: Duration::from_secs(3600),
};
pub const INQUIRIES: RateScope = RateScope {
    name: "inquiry",
    limit: 5,
    window: Duration::from_secs(3600),
};

#[derive(Debug, Error)]
#[error("rate limit exceeded, retry in {retry_after_secs}s")]
pub struct RateLimitExceeded {
    pub retry_after_secs: u64,
}

impl From<RateLimitExceeded> for AppError {
    fn from(err: RateLimitExceeded) -> Self {
        AppError::rate_limited(err.to_string())
    }
}

struct Window {
    started_at: Instant,
    count: u32,
}

#[derive(Clone, Default)]
pub struct RateLimitService {
    windows: Arc<Mutex<HashMap<(&'static str, String), Window>>>,
}

impl RateLimitService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one hit for `client` under `scope`, or reject when the current
    /// window is full.
    pub async fn check(&self, scope: RateScope, client: &str) -> Result<(), RateLimitExceeded> {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;
        let window = windows
            .entry((scope.name, client.to_string()))
            .or_insert(Window {
                started_at: now,
                count: 0,
            });

        if now.duration_since(window.started_at) >= scope.window {
            window.started_at = now;
            window.count = 0;
        }

        if window.count >= scope.limit {
            let elapsed = now.duration_since(window.started_at);
            let retry_after_secs = scope.window.saturating_sub(elapsed).as_secs().max(1);
            return Err(RateLimitExceeded { retry_after_secs });
        }

        window.count += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny(limit: u32, window_ms: u64) -> RateScope {
        RateScope {
            name: "test",
            limit,
            window: Duration::from_millis(window_ms),
        }
    }

    #[tokio::test]
    async fn rejects_past_the_limit_within_a_window() {
        let limiter = RateLimitService::new();
        let scope = tiny(2, 60_000);
        assert!(limiter.check(scope, "1.2.3.4").await.is_ok());
        assert!(limiter.check(scope, "1.2.3.4").await.is_ok());
        assert!(limiter.check(scope, "1.2.3.4").await.is_err());
        // another client is unaffected
        assert!(limiter.check(scope, "5.6.7.8").await.is_ok());
    }

    #[tokio::test]
    async fn window_resets_at_the_boundary() {
        let limiter = RateLimitService::new();
        let scope = tiny(1, 30);
        assert!(limiter.check(scope, "1.2.3.4").await.is_ok());
        assert!(limiter.check(scope, "1.2.3.4").await.is_err());
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(limiter.check(scope, "1.2.3.4").await.is_ok());
    }
}
