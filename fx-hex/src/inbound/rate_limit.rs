//! Rate limiting middleware using Governor.
//!
//! Implements per-caller rate limiting with a token bucket algorithm. Callers
//! are identified by their RapidAPI key.
//!
//! A caller idle for a whole window has a full bucket again, so its limiter is
//! indistinguishable from a fresh one and is swept out of the map.

use axum::{
    Json,
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use governor::{
    Quota, RateLimiter,
    clock::{Clock, DefaultClock},
    state::{InMemoryState, NotKeyed},
};
use serde_json::json;
use std::{
    num::NonZeroU32,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

use super::auth::{RAPIDAPI_KEY_HEADER, is_public};

/// Requests allowed per caller within a rolling window.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window: Duration,
}

impl Default for RateLimitConfig {
    /// 100 requests per 15 minutes.
    fn default() -> Self {
        Self {
            max_requests: 100,
            window: Duration::from_secs(15 * 60),
        }
    }
}

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

struct CallerLimiter {
    limiter: Arc<DirectLimiter>,
    /// Milliseconds since `RateLimiterState::started` of the last request.
    last_seen_ms: AtomicU64,
}

/// Rate limiter state shared across requests.
pub struct RateLimiterState {
    /// Per-key rate limiters
    limiters: DashMap<String, CallerLimiter>,
    /// Default quota for new keys
    quota: Quota,
    clock: DefaultClock,
    window: Duration,
    started: Instant,
    last_sweep_ms: AtomicU64,
}

impl Default for RateLimiterState {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

impl RateLimiterState {
    /// Creates a new rate limiter state.
    ///
    /// The full `max_requests` burst is available up front and refills evenly
    /// over `window`.
    pub fn new(config: RateLimitConfig) -> Self {
        let burst = NonZeroU32::new(config.max_requests).unwrap_or(NonZeroU32::MIN);
        let quota = Quota::with_period(config.window / burst.get())
            .unwrap_or_else(|| Quota::per_second(burst))
            .allow_burst(burst);

        Self {
            limiters: DashMap::new(),
            quota,
            clock: DefaultClock::default(),
            window: config.window,
            started: Instant::now(),
            last_sweep_ms: AtomicU64::new(0),
        }
    }

    /// Checks if a request should be rate limited.
    /// Returns how long to wait when the caller is over quota.
    pub fn check(&self, key: &str) -> Result<(), Duration> {
        let now_ms = self.elapsed_ms();
        self.sweep_idle(now_ms);

        // The map guard is dropped before the limiter is consulted.
        let limiter = {
            let entry = self
                .limiters
                .entry(key.to_string())
                .or_insert_with(|| CallerLimiter {
                    limiter: Arc::new(RateLimiter::direct(self.quota)),
                    last_seen_ms: AtomicU64::new(now_ms),
                });
            entry.last_seen_ms.store(now_ms, Ordering::Relaxed);
            entry.limiter.clone()
        };

        limiter
            .check()
            .map_err(|not_until| not_until.wait_time_from(self.clock.now()))
    }

    /// Number of callers currently holding a limiter.
    pub fn tracked_callers(&self) -> usize {
        self.limiters.len()
    }

    fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    /// Drops limiters idle for at least one window. Runs at most once per window.
    fn sweep_idle(&self, now_ms: u64) {
        let window_ms = u64::try_from(self.window.as_millis()).unwrap_or(u64::MAX);
        let last = self.last_sweep_ms.load(Ordering::Relaxed);
        if now_ms.saturating_sub(last) < window_ms {
            return;
        }
        if self
            .last_sweep_ms
            .compare_exchange(last, now_ms, Ordering::AcqRel, Ordering::Relaxed)
            .is_err()
        {
            return;
        }

        let before = self.limiters.len();
        self.limiters.retain(|_, caller| {
            now_ms.saturating_sub(caller.last_seen_ms.load(Ordering::Relaxed)) < window_ms
        });
        let evicted = before.saturating_sub(self.limiters.len());
        if evicted > 0 {
            tracing::debug!(evicted, "Evicted idle rate limiters");
        }
    }
}

/// Rate limiting middleware.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiterState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if is_public(request.uri().path()) {
        return next.run(request).await;
    }

    let key = request
        .headers()
        .get(RAPIDAPI_KEY_HEADER)
        .and_then(|h| h.to_str().ok())
        .filter(|s| !s.is_empty())
        .unwrap_or("anonymous")
        .to_string();

    if let Err(wait) = limiter.check(&key) {
        tracing::warn!(caller = %key, "Rate limit exceeded");
        let retry_after = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({
                "error": {
                    "code": "RATE_LIMIT_EXCEEDED",
                    "message": "Too many requests from this API key, please try again later."
                },
                "retry_after_seconds": retry_after
            })),
        )
            .into_response();
    }

    next.run(request).await
}
