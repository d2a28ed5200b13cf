//! Per-client token bucket rate limiting.

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use dashmap::DashMap;
use oracle_core::config::ProxyServerConfig;
use serde_json::json;
use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
    time::{Duration, Instant},
};

/// Token bucket limiter keyed by client IP.
///
/// The number of tracked clients is capped; a new client arriving at the cap
/// is refused rather than tracked.
pub struct RateLimiter {
    buckets: Arc<DashMap<IpAddr, TokenBucket>>,
    capacity: u32,
    refill_per_second: u32,
    idle_ttl: Duration,
    max_clients: usize,
}

#[derive(Debug, Clone)]
struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
    last_seen: Instant,
}

impl TokenBucket {
    fn full(capacity: u32, now: Instant) -> Self {
        Self { tokens: f64::from(capacity), last_refill: now, last_seen: now }
    }

    fn take(&mut self, now: Instant, capacity: u32, refill_per_second: u32) -> bool {
        self.last_seen = now;

        let earned = now.duration_since(self.last_refill).as_secs_f64() * f64::from(refill_per_second);
        if earned > 0.0 {
            self.tokens = (self.tokens + earned).min(f64::from(capacity));
            self.last_refill = now;
        }

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

impl RateLimiter {
    const DEFAULT_MAX_CLIENTS: usize = 100_000;
    const IDLE_TTL: Duration = Duration::from_secs(300);

    #[must_use]
    pub fn new(capacity: u32, refill_per_second: u32) -> Self {
        Self {
            buckets: Arc::new(DashMap::new()),
            capacity,
            refill_per_second,
            idle_ttl: Self::IDLE_TTL,
            max_clients: Self::DEFAULT_MAX_CLIENTS,
        }
    }

    #[must_use]
    pub fn from_config(config: &ProxyServerConfig) -> Self {
        Self::new(config.rate_limit_max_tokens, config.rate_limit_refill_rate)
    }

    #[must_use]
    pub fn with_max_clients(mut self, max_clients: usize) -> Self {
        self.max_clients = max_clients;
        self
    }

    /// Takes one token for `client`. Returns `false` when the request must be refused.
    #[must_use]
    pub fn check(&self, client: IpAddr) -> bool {
        let now = Instant::now();

        if let Some(mut bucket) = self.buckets.get_mut(&client) {
            return bucket.take(now, self.capacity, self.refill_per_second);
        }

        if self.buckets.len() >= self.max_clients {
            return false;
        }

        let mut bucket =
            self.buckets.entry(client).or_insert_with(|| TokenBucket::full(self.capacity, now));
        bucket.take(now, self.capacity, self.refill_per_second)
    }

    /// Drops clients idle for longer than the TTL. Returns how many were removed.
    pub fn evict_idle(&self) -> usize {
        let now = Instant::now();
        let before = self.buckets.len();
        self.buckets.retain(|_, bucket| now.duration_since(bucket.last_seen) < self.idle_ttl);
        before.saturating_sub(self.buckets.len())
    }

    /// Runs [`Self::evict_idle`] periodically until the task is aborted.
    pub fn spawn_eviction(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let limiter = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(limiter.idle_ttl);
            loop {
                interval.tick().await;
                let removed = limiter.evict_idle();
                if removed > 0 {
                    tracing::debug!(removed, "evicted idle rate limit buckets");
                }
            }
        })
    }

    #[must_use]
    pub fn client_count(&self) -> usize {
        self.buckets.len()
    }

    #[doc(hidden)]
    #[must_use]
    pub fn tokens_left(&self, client: IpAddr) -> Option<f64> {
        self.buckets.get(&client).map(|bucket| bucket.tokens)
    }
}

/// Refuses requests with 429 once the client's bucket is empty.
pub async fn rate_limit_middleware(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(limiter): State<Arc<RateLimiter>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let client = addr.ip();

    if !limiter.check(client) {
        tracing::warn!(client = %client, "rate limit exceeded");
        return (StatusCode::TOO_MANY_REQUESTS, Json(json!({ "error": "Rate limit exceeded" })))
            .into_response();
    }

    next.run(request).await
}
