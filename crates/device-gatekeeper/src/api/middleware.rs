//! Rate limiting and request logging middleware.

use crate::config::RateLimitConfig;
use crate::error::GatekeeperError;
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::{num::NonZeroU32, sync::Arc, time::Instant};
use tracing::{debug, error, info, trace, warn};

type GlobalLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// One quota shared by every rate-limited route.
#[derive(Clone)]
pub struct RateLimitState {
    limiter: Arc<GlobalLimiter>,
    retry_after_secs: u64,
}

impl RateLimitState {
    /// A limit of zero is treated as one request per minute.
    pub fn new(requests_per_minute: u32) -> Self {
        let quota = Quota::per_minute(
            NonZeroU32::new(requests_per_minute).unwrap_or(NonZeroU32::MIN),
        );

        // Whole seconds until the quota has room for one more request
        let interval = quota.replenish_interval();
        let retry_after_secs = (interval.as_secs() + u64::from(interval.subsec_nanos() > 0)).max(1);

        Self {
            limiter: Arc::new(RateLimiter::direct(quota)),
            retry_after_secs,
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.global_per_minute)
    }

    /// Limit high enough that tests never hit it.
    pub fn permissive() -> Self {
        Self::new(10_000)
    }

    /// Take one request from the quota.
    pub fn allow(&self) -> bool {
        self.limiter.check().is_ok()
    }

    /// Value sent in `Retry-After` when a request is turned away.
    pub fn retry_after_secs(&self) -> u64 {
        self.retry_after_secs
    }
}

/// Answers 429 with a `Retry-After` hint once the quota is spent.
pub async fn rate_limit_middleware(
    State(rate_limit): State<RateLimitState>,
    request: Request,
    next: Next,
) -> Response {
    if !rate_limit.allow() {
        warn!(
            uri = %request.uri(),
            retry_after = rate_limit.retry_after_secs(),
            "Rate limit exceeded"
        );
        let mut response = GatekeeperError::RateLimitExceeded.into_response();
        response.headers_mut().insert(
            header::RETRY_AFTER,
            HeaderValue::from(rate_limit.retry_after_secs()),
        );
        return response;
    }

    next.run(request).await
}

/// Logs each request once it completes, at a level chosen by the outcome.
///
/// Server errors log at `error`, client errors at `info`, everything else
/// at `debug`. Health checks only show up at `trace`.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let start = Instant::now();

    let response = next.run(request).await;

    let status = response.status();
    let elapsed_ms = start.elapsed().as_millis() as u64;

    if path == "/health" {
        trace!(%method, %path, %status, elapsed_ms, "Health check");
    } else if status.is_server_error() {
        error!(%method, %path, %status, elapsed_ms, "Request failed");
    } else if status.is_client_error() {
        info!(%method, %path, %status, elapsed_ms, "Request rejected");
    } else {
        debug!(%method, %path, %status, elapsed_ms, "Request handled");
    }

    response
}
