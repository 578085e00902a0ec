//! In-memory login rate limiter.
//!
//! Uses a fixed-window counter of failed attempts per host. A host that
//! reaches the limit is denied until its window expires. Expired windows
//! are evicted whenever a bad attempt is recorded.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::Timestamp;
use crate::ports::{LoginLimits, LoginRateLimiter, RateLimitKey, RateLimitResult};

/// In-memory limiter for failed authentication attempts.
#[derive(Debug)]
pub struct InMemoryLoginRateLimiter {
    limits: Arc<RwLock<LoginLimits>>,
    /// Per-host window state.
    windows: Arc<RwLock<HashMap<String, WindowState>>>,
}

/// State for a single rate limit window.
#[derive(Debug, Clone)]
struct WindowState {
    /// Failed attempts in the current window.
    count: u32,
    /// When the current window started.
    window_start: i64,
}

impl InMemoryLoginRateLimiter {
    pub fn new(limits: LoginLimits) -> Self {
        Self {
            limits: Arc::new(RwLock::new(limits)),
            windows: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(LoginLimits::default())
    }

    /// Current limits, mainly for tests.
    pub async fn limits(&self) -> LoginLimits {
        *self.limits.read().await
    }

    fn now_secs() -> i64 {
        Timestamp::now().as_unix_secs()
    }
}

#[async_trait]
impl LoginRateLimiter for InMemoryLoginRateLimiter {
    async fn check(&self, key: &RateLimitKey) -> RateLimitResult {
        let limits = *self.limits.read().await;
        let now = Self::now_secs();
        let windows = self.windows.read().await;

        let count = match windows.get(&key.to_string()) {
            Some(state) if now < state.window_start + i64::from(limits.window_secs) => state.count,
            _ => 0,
        };

        if count >= limits.attempts_per_window {
            let window_end = windows
                .get(&key.to_string())
                .map(|state| state.window_start + i64::from(limits.window_secs))
                .unwrap_or(now);
            let retry_after = u32::try_from((window_end - now).max(1)).unwrap_or(u32::MAX);
            return RateLimitResult::Denied {
                retry_after_secs: retry_after,
            };
        }

        RateLimitResult::Allowed {
            remaining: limits.attempts_per_window - count,
        }
    }

    async fn bad_attempt(&self, key: &RateLimitKey) {
        let window_secs = i64::from(self.limits.read().await.window_secs);
        let now = Self::now_secs();
        let mut windows = self.windows.write().await;
        windows.retain(|_, state| now < state.window_start + window_secs);

        let state = windows.entry(key.to_string()).or_insert(WindowState {
            count: 0,
            window_start: now,
        });

        state.count = state.count.saturating_add(1);
    }

    async fn apply_limits(&self, limits: LoginLimits) {
        *self.limits.write().await = limits;
    }
}
