//! Rate limiting port for authentication attempts.
//!
//! Authentication is the only action a client can take before it is known,
//! so it is the brute-force surface. Every attempt is checked against a
//! per-host limiter first; failed attempts are reported back so repeated
//! failures lock the host out for the rest of the window.

use async_trait::async_trait;
use std::fmt;

/// Port for login rate limiting.
///
/// Implementations should be thread-safe and support concurrent access.
#[async_trait]
pub trait LoginRateLimiter: Send + Sync {
    /// Check whether the host may attempt to authenticate right now.
    async fn check(&self, key: &RateLimitKey) -> RateLimitResult;

    /// Record a failed attempt for the host.
    async fn bad_attempt(&self, key: &RateLimitKey);

    /// Replace the limits, e.g. after instance settings changed.
    async fn apply_limits(&self, limits: LoginLimits);
}

/// Key identifying what to rate limit.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct RateLimitKey {
    /// Remote host (IP address without port).
    pub host: String,
}

impl RateLimitKey {
    /// Creates a host-based key from a remote address.
    ///
    /// Ports are stripped so that reconnecting from a new source port does
    /// not reset the counter.
    pub fn host(address: &str) -> Self {
        let host = match address.parse::<std::net::SocketAddr>() {
            Ok(addr) => addr.ip().to_string(),
            Err(_) => address.to_string(),
        };
        Self { host }
    }
}

impl fmt::Display for RateLimitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ratelimit:login:{}", self.host)
    }
}

/// Failed-attempt budget per host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoginLimits {
    /// Failed attempts tolerated per window.
    pub attempts_per_window: u32,
    /// Window length in seconds.
    pub window_secs: u32,
}

impl Default for LoginLimits {
    fn default() -> Self {
        Self {
            attempts_per_window: 10,
            window_secs: 300,
        }
    }
}

/// Result of a rate limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitResult {
    /// The host may attempt to authenticate.
    Allowed { remaining: u32 },
    /// The host is locked out.
    Denied { retry_after_secs: u32 },
}

impl RateLimitResult {
    /// Returns true if the request was allowed.
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitResult::Allowed { .. })
    }

    /// Returns true if the request was denied.
    pub fn is_denied(&self) -> bool {
        matches!(self, RateLimitResult::Denied { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_key_strips_port() {
        let key = RateLimitKey::host("192.168.1.1:51234");
        assert_eq!(key.host, "192.168.1.1");
    }

    #[test]
    fn host_key_keeps_bare_host() {
        let key = RateLimitKey::host("10.0.0.1");
        assert_eq!(key.host, "10.0.0.1");
    }

    #[test]
    fn host_key_handles_ipv6() {
        let key = RateLimitKey::host("[::1]:8080");
        assert_eq!(key.host, "::1");
    }

    #[test]
    fn key_display_format() {
        assert_eq!(RateLimitKey::host("10.0.0.1").to_string(), "ratelimit:login:10.0.0.1");
    }

    #[test]
    fn rate_limit_result_predicates() {
        assert!(RateLimitResult::Allowed { remaining: 3 }.is_allowed());
        assert!(RateLimitResult::Denied { retry_after_secs: 30 }.is_denied());
    }
}
