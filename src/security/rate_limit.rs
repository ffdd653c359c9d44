//! Sliding-window rate limiting with automatic IP blocking.
//!
//! Admission checks the block list first (cheap rejection), then counts the
//! caller's samples inside the trailing window. Breaching the quota upserts
//! an automatic block and denies with the block lifetime as retry-after.
//! The count and the sample insert are two separate statements: a burst of
//! concurrent requests from one IP can overshoot the quota by a few before
//! the block lands. That soft bound is accepted; the block upsert itself is
//! race-safe (conflict is a no-op).

use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;

use crate::config::RateLimitConfig;
use crate::error::AppError;
use crate::http::server::AppState;
use crate::store::Store;

/// Reason recorded on automatic block entries.
const AUTO_BLOCK_REASON: &str = "Rate limit exceeded";

pub const X_RATE_LIMIT_LIMIT: &str = "x-ratelimit-limit";
pub const X_RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";

/// Outcome of an admission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// Request admitted; `remaining` is the quota left in the window.
    Allowed { remaining: u32 },
    /// Request denied.
    Denied(DenyReason),
}

/// Why a request was denied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
    /// An active block entry exists for the IP.
    Blocked,
    /// The window quota was breached on this request; an automatic block
    /// now covers the IP for `retry_after`.
    RateLimited { retry_after: Duration },
}

/// Per-IP admission control backed by the durable store.
pub struct SlidingWindowLimiter {
    store: Store,
    config: RateLimitConfig,
}

impl SlidingWindowLimiter {
    pub fn new(store: Store, config: RateLimitConfig) -> Self {
        Self { store, config }
    }

    /// Decide admission for one request from `ip` at `now`.
    pub fn admit(&self, ip: &str, now: i64) -> Result<Admission, rusqlite::Error> {
        if self.store.active_block(ip, now)?.is_some() {
            return Ok(Admission::Denied(DenyReason::Blocked));
        }

        let window_start = now - self.config.window_secs as i64;
        let count = self.store.count_samples_since(ip, window_start)?;

        if count >= i64::from(self.config.max_requests) {
            let expires_at = now + self.config.auto_block_secs as i64;
            self.store
                .insert_auto_block(ip, AUTO_BLOCK_REASON, now, expires_at)?;
            tracing::warn!(%ip, count, "rate limit breached, auto-block inserted");
            return Ok(Admission::Denied(DenyReason::RateLimited {
                retry_after: Duration::from_secs(self.config.auto_block_secs),
            }));
        }

        self.store.insert_sample(ip, now)?;
        let remaining = self.config.max_requests - count as u32 - 1;
        Ok(Admission::Allowed { remaining })
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }
}

/// Middleware guarding the public generation endpoint. Allowed responses
/// carry the remaining-quota headers; denials map through [`AppError`].
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let ip = addr.ip().to_string();
    let now = Utc::now().timestamp();

    let admission = match state.limiter.admit(&ip, now) {
        Ok(admission) => admission,
        Err(e) => return AppError::Persistence(e).into_response(),
    };

    match admission {
        Admission::Allowed { remaining } => {
            let limit = state.limiter.config().max_requests;
            let mut response = next.run(request).await;
            let headers = response.headers_mut();
            if let Ok(value) = HeaderValue::from_str(&limit.to_string()) {
                headers.insert(X_RATE_LIMIT_LIMIT, value);
            }
            if let Ok(value) = HeaderValue::from_str(&remaining.to_string()) {
                headers.insert(X_RATE_LIMIT_REMAINING, value);
            }
            response
        }
        Admission::Denied(DenyReason::Blocked) => {
            tracing::debug!(%ip, "request rejected: IP blocked");
            AppError::Blocked.into_response()
        }
        Admission::Denied(DenyReason::RateLimited { retry_after }) => {
            AppError::RateLimited {
                retry_after_secs: retry_after.as_secs(),
            }
            .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max_requests: u32) -> SlidingWindowLimiter {
        let store = Store::open_in_memory().unwrap();
        let config = RateLimitConfig {
            window_secs: 60,
            max_requests,
            auto_block_secs: 3600,
            ..RateLimitConfig::default()
        };
        SlidingWindowLimiter::new(store, config)
    }

    #[test]
    fn admits_up_to_the_quota_then_rate_limits() {
        let limiter = limiter(50);

        // 50 requests spread over 10 seconds are all admitted.
        for n in 0..50 {
            let now = 1000 + (n as i64) % 10;
            match limiter.admit("203.0.113.1", now).unwrap() {
                Admission::Allowed { remaining } => assert_eq!(remaining, 50 - n - 1),
                denied => panic!("request {n} unexpectedly denied: {denied:?}"),
            }
        }

        // The 51st is denied with the block lifetime as retry-after.
        assert_eq!(
            limiter.admit("203.0.113.1", 1010).unwrap(),
            Admission::Denied(DenyReason::RateLimited {
                retry_after: Duration::from_secs(3600)
            })
        );
    }

    #[test]
    fn breach_promotes_to_a_block_until_expiry() {
        let limiter = limiter(2);
        limiter.admit("203.0.113.2", 1000).unwrap();
        limiter.admit("203.0.113.2", 1001).unwrap();

        assert!(matches!(
            limiter.admit("203.0.113.2", 1002).unwrap(),
            Admission::Denied(DenyReason::RateLimited { .. })
        ));

        // Every request before expiry sees the block, not a fresh count.
        assert_eq!(
            limiter.admit("203.0.113.2", 1003).unwrap(),
            Admission::Denied(DenyReason::Blocked)
        );
        assert_eq!(
            limiter.admit("203.0.113.2", 1002 + 3599).unwrap(),
            Admission::Denied(DenyReason::Blocked)
        );

        // Exactly at expiry the IP is admitted again (samples have aged out).
        assert!(matches!(
            limiter.admit("203.0.113.2", 1002 + 3600).unwrap(),
            Admission::Allowed { .. }
        ));
    }

    #[test]
    fn quota_is_per_ip() {
        let limiter = limiter(1);
        assert!(matches!(
            limiter.admit("203.0.113.3", 1000).unwrap(),
            Admission::Allowed { .. }
        ));
        assert!(matches!(
            limiter.admit("203.0.113.4", 1000).unwrap(),
            Admission::Allowed { .. }
        ));
    }

    #[test]
    fn samples_outside_the_window_do_not_count() {
        let limiter = limiter(2);
        limiter.admit("203.0.113.5", 1000).unwrap();
        limiter.admit("203.0.113.5", 1001).unwrap();

        // 61 seconds later both samples have left the trailing window.
        assert!(matches!(
            limiter.admit("203.0.113.5", 1062).unwrap(),
            Admission::Allowed { .. }
        ));
    }
}
