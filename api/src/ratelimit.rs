use std::{num::NonZeroU32, sync::Arc, time::Duration};

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
};
use governor::{
    Quota, RateLimiter,
    clock::{Clock, DefaultClock},
    middleware::NoOpMiddleware,
    state::keyed::DashMapStateStore,
};
use tokio::task::JoinHandle;

use crate::{
    App,
    config::CommentRate,
    error::{ApiRequestError, AppError},
    real_ip::ClientIp,
};

type Buckets<C> =
    RateLimiter<String, DashMapStateStore<String>, C, NoOpMiddleware<<C as Clock>::Instant>>;

#[derive(thiserror::Error, Debug)]
#[error("Too many requests, retry in {} seconds", .retry_after.as_secs().max(1))]
pub struct Throttled {
    pub retry_after: Duration,
}

impl ApiRequestError for Throttled {
    fn status_code(&self) -> StatusCode {
        StatusCode::TOO_MANY_REQUESTS
    }

    fn code(&self) -> &'static str {
        "RATE_LIMIT_EXCEEDED"
    }

    fn retry_after(&self) -> Option<Duration> {
        Some(self.retry_after)
    }
}

pub fn comment_quota(rate: CommentRate) -> Quota {
    let per_minute = NonZeroU32::new(rate.per_minute).unwrap_or(NonZeroU32::MIN);
    let burst = NonZeroU32::new(rate.burst).unwrap_or(NonZeroU32::MIN);
    Quota::per_minute(per_minute).allow_burst(burst)
}

/// One token bucket per visitor, created on first sight. Buckets never share
/// tokens. A bucket that has refilled completely holds no information and is
/// dropped by [`VisitorRateLimiter::prune`].
pub struct VisitorRateLimiter<C: Clock = DefaultClock> {
    visitors: Buckets<C>,
    clock: C,
}

impl VisitorRateLimiter<DefaultClock> {
    pub fn new(quota: Quota) -> Self {
        Self::with_clock(quota, DefaultClock::default())
    }
}

impl<C: Clock + Clone> VisitorRateLimiter<C> {
    pub fn with_clock(quota: Quota, clock: C) -> Self {
        VisitorRateLimiter {
            visitors: RateLimiter::dashmap_with_clock(quota, clock.clone()),
            clock,
        }
    }

    /// Takes a token from the visitor's bucket. A refusal leaves the bucket
    /// untouched.
    pub fn check(&self, visitor: &str) -> Result<(), Throttled> {
        self.visitors
            .check_key(&visitor.to_owned())
            .map_err(|not_until| Throttled {
                retry_after: not_until.wait_time_from(self.clock.now()),
            })
    }

    /// Forgets every visitor whose bucket is full again.
    pub fn prune(&self) {
        self.visitors.retain_recent();
        self.visitors.shrink_to_fit();
    }

    pub fn tracked_visitors(&self) -> usize {
        self.visitors.len()
    }
}

impl<C> VisitorRateLimiter<C>
where
    C: Clock + Clone + Send + Sync + 'static,
    C::Instant: Send + Sync,
{
    pub fn spawn_pruner(self: Arc<Self>, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                let before = self.tracked_visitors();
                self.prune();
                tracing::debug!(
                    before,
                    after = self.tracked_visitors(),
                    "Pruned comment rate limit buckets"
                );
            }
        })
    }
}

/// Passes when the requesting visitor still has a comment token left.
pub struct CommentRateLimit;

impl FromRequestParts<App> for CommentRateLimit {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, app: &App) -> Result<Self, Self::Rejection> {
        let ClientIp(visitor) = ClientIp::from_request_parts(parts, app).await?;

        if let Err(throttled) = app.comment_limiter.check(&visitor) {
            tracing::warn!(
                visitor = %visitor,
                retry_after_ms = throttled.retry_after.as_millis() as u64,
                "Comment rate limit exceeded"
            );
            return Err(throttled.into());
        }

        Ok(CommentRateLimit)
    }
}
