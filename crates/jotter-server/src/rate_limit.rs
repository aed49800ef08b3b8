use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::ConnectInfo,
    http::{HeaderName, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use tokio::sync::Mutex;
use tracing::warn;

/// Fixed body returned to rate-limited clients.
pub const LIMIT_MESSAGE: &str =
    "Too many login attempts from this IP, please try again after a 60 second pause";

// Standard draft rate-limit headers; the legacy X-RateLimit-* family is
// deliberately not emitted.
const HEADER_LIMIT: HeaderName = HeaderName::from_static("ratelimit-limit");
const HEADER_REMAINING: HeaderName = HeaderName::from_static("ratelimit-remaining");
const HEADER_RESET: HeaderName = HeaderName::from_static("ratelimit-reset");

/// Timestamps of recent hits for one client IP, oldest first.
#[derive(Debug, Default)]
struct SlidingWindow {
    hits: VecDeque<Instant>,
}

impl SlidingWindow {
    /// Drop hits older than `window`, record `now`, and return the count
    /// of hits still inside the window (including this one).
    fn record(&mut self, now: Instant, window: Duration) -> u32 {
        while let Some(front) = self.hits.front() {
            if now.duration_since(*front) >= window {
                self.hits.pop_front();
            } else {
                break;
            }
        }
        self.hits.push_back(now);
        self.hits.len() as u32
    }

    fn last_hit(&self) -> Option<Instant> {
        self.hits.back().copied()
    }
}

/// Outcome of a limiter check, carrying what the response headers need.
#[derive(Debug, Clone, Copy)]
pub struct Decision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_secs: u64,
}

/// Sliding-window login rate limiter keyed by client IP.
///
/// State is in-memory and process-local; a restart forgets all counters.
#[derive(Clone)]
pub struct RateLimiter {
    windows: Arc<Mutex<HashMap<IpAddr, SlidingWindow>>>,
    max_attempts: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_attempts: u32, window: Duration) -> Self {
        Self {
            windows: Arc::new(Mutex::new(HashMap::new())),
            max_attempts,
            window,
        }
    }

    /// Record one request for `ip` and decide whether it may pass.
    ///
    /// Every request counts against the window, including rejected ones.
    pub async fn check(&self, ip: IpAddr) -> Decision {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;
        let window = windows.entry(ip).or_default();
        let count = window.record(now, self.window);

        let reset_secs = window
            .hits
            .front()
            .map(|oldest| {
                let remaining = self.window.saturating_sub(now.duration_since(*oldest));
                remaining.as_secs().max(1)
            })
            .unwrap_or(0);

        Decision {
            allowed: count <= self.max_attempts,
            limit: self.max_attempts,
            remaining: self.max_attempts.saturating_sub(count),
            reset_secs,
        }
    }

    /// Evict IPs with no hits in the last `max_idle` period.
    pub async fn purge_stale(&self, max_idle: Duration) {
        let mut windows = self.windows.lock().await;
        let now = Instant::now();
        windows.retain(|_, window| {
            window
                .last_hit()
                .is_some_and(|last| now.duration_since(last) < max_idle)
        });
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(5, Duration::from_secs(60))
    }
}

pub async fn login_rate_limit(
    axum::extract::State(limiter): axum::extract::State<RateLimiter>,
    req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    // Unresolvable clients share one bucket rather than bypassing the limit.
    let ip = extract_client_ip(&req).unwrap_or(IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED));
    let decision = limiter.check(ip).await;

    if !decision.allowed {
        let origin = req
            .headers()
            .get("origin")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-");
        warn!(
            ip = %ip,
            method = %req.method(),
            url = %req.uri(),
            origin = %origin,
            "Too many requests: {}",
            LIMIT_MESSAGE
        );

        let body = Json(serde_json::json!({ "message": LIMIT_MESSAGE }));
        let mut response = (StatusCode::TOO_MANY_REQUESTS, body).into_response();
        apply_headers(&mut response, &decision);
        return response;
    }

    let mut response = next.run(req).await;
    apply_headers(&mut response, &decision);
    response
}

fn apply_headers(response: &mut Response, decision: &Decision) {
    let headers = response.headers_mut();
    headers.insert(HEADER_LIMIT, HeaderValue::from(decision.limit));
    headers.insert(HEADER_REMAINING, HeaderValue::from(decision.remaining));
    headers.insert(HEADER_RESET, HeaderValue::from(decision.reset_secs));
}

/// Try ConnectInfo first, then X-Forwarded-For, then X-Real-IP.
fn extract_client_ip<B>(req: &Request<B>) -> Option<IpAddr> {
    if let Some(connect_info) = req.extensions().get::<ConnectInfo<std::net::SocketAddr>>() {
        return Some(connect_info.0.ip());
    }

    if let Some(forwarded) = req.headers().get("x-forwarded-for") {
        if let Ok(value) = forwarded.to_str() {
            if let Some(first) = value.split(',').next() {
                if let Ok(ip) = first.trim().parse::<IpAddr>() {
                    return Some(ip);
                }
            }
        }
    }

    if let Some(real_ip) = req.headers().get("x-real-ip") {
        if let Ok(value) = real_ip.to_str() {
            if let Ok(ip) = value.trim().parse::<IpAddr>() {
                return Some(ip);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_allows_up_to_limit_then_rejects() {
        let limiter = RateLimiter::new(5, Duration::from_secs(60));
        let ip: IpAddr = "127.0.0.1".parse().unwrap();

        for _ in 0..5 {
            assert!(limiter.check(ip).await.allowed);
        }

        let decision = limiter.check(ip).await;
        assert!(!decision.allowed);
        assert_eq!(decision.remaining, 0);
        assert!(decision.reset_secs >= 1);
    }

    #[tokio::test]
    async fn test_different_ips_are_independent() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        let ip1: IpAddr = "10.0.0.1".parse().unwrap();
        let ip2: IpAddr = "10.0.0.2".parse().unwrap();

        assert!(limiter.check(ip1).await.allowed);
        assert!(limiter.check(ip1).await.allowed);
        assert!(!limiter.check(ip1).await.allowed);

        assert!(limiter.check(ip2).await.allowed);
    }

    #[tokio::test]
    async fn test_window_expiry_readmits() {
        let limiter = RateLimiter::new(1, Duration::from_millis(50));
        let ip: IpAddr = "192.168.1.1".parse().unwrap();

        assert!(limiter.check(ip).await.allowed);
        assert!(!limiter.check(ip).await.allowed);

        tokio::time::sleep(Duration::from_millis(80)).await;

        assert!(limiter.check(ip).await.allowed);
    }

    #[tokio::test]
    async fn test_remaining_counts_down() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        let ip: IpAddr = "10.1.1.1".parse().unwrap();

        assert_eq!(limiter.check(ip).await.remaining, 2);
        assert_eq!(limiter.check(ip).await.remaining, 1);
        assert_eq!(limiter.check(ip).await.remaining, 0);
    }

    #[tokio::test]
    async fn test_purge_stale() {
        let limiter = RateLimiter::new(5, Duration::from_secs(60));
        let ip: IpAddr = "192.168.1.1".parse().unwrap();
        limiter.check(ip).await;

        limiter.purge_stale(Duration::ZERO).await;

        let windows = limiter.windows.lock().await;
        assert!(windows.is_empty());
    }
}
