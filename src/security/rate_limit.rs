//! Per-client rate limiting middleware.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::config::RateLimitConfig;
use crate::observability::metrics;

/// Request count for one client within the current window.
struct Window {
    started: Instant,
    count: u32,
}

/// Outcome of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    /// Rejected; retry after the given delay.
    Reject(Duration),
}

/// Fixed-window limiter keyed by client IP.
pub struct RateLimiterState {
    windows: Mutex<HashMap<IpAddr, Window>>,
    enabled: bool,
    max_requests: u32,
    window: Duration,
}

impl RateLimiterState {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            enabled: config.enabled,
            max_requests: config.max_requests,
            window: Duration::from_secs(config.window_secs),
        }
    }

    /// Count one request from `client` at `now`.
    pub fn check(&self, client: IpAddr, now: Instant) -> Decision {
        if !self.enabled {
            return Decision::Allow;
        }

        let mut windows = self.windows.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        // Drop expired windows so idle clients do not accumulate.
        if windows.len() > 1024 {
            let window = self.window;
            windows.retain(|_, w| now.duration_since(w.started) < window);
        }

        let entry = windows.entry(client).or_insert(Window { started: now, count: 0 });
        if now.duration_since(entry.started) >= self.window {
            entry.started = now;
            entry.count = 0;
        }

        if entry.count < self.max_requests {
            entry.count += 1;
            Decision::Allow
        } else {
            Decision::Reject(self.window.saturating_sub(now.duration_since(entry.started)))
        }
    }
}

/// Middleware function for per-IP rate limiting.
pub async fn rate_limit_middleware(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<Arc<RateLimiterState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    match state.check(addr.ip(), Instant::now()) {
        Decision::Allow => next.run(request).await,
        Decision::Reject(retry_after) => {
            tracing::warn!(client = %addr.ip(), "Rate limit exceeded");
            metrics::record_rate_limited();

            let mut response = (StatusCode::TOO_MANY_REQUESTS, "Too Many Requests").into_response();
            let secs = retry_after.as_secs().max(1);
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
            response
        }
    }
}
