//! Global request budget.
//!
//! A single token bucket shared by every route. A request that finds the
//! bucket empty is rejected with 429 immediately; nothing is queued.

use std::num::NonZeroU32;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use governor::{
    clock::{Clock, DefaultClock},
    middleware::NoOpMiddleware,
    state::{InMemoryState, NotKeyed},
    Quota,
};
use tracing::debug;

use super::error::AppError;
use super::state::AppState;

type DirectLimiter<C> =
    governor::RateLimiter<NotKeyed, InMemoryState, C, NoOpMiddleware<<C as Clock>::Instant>>;

/// GCRA bucket replenished at `rate_per_minute` with room for `burst`.
pub struct RateLimiter<C: Clock = DefaultClock> {
    inner: DirectLimiter<C>,
}

impl RateLimiter {
    pub fn new(rate_per_minute: u32, burst: u32) -> Self {
        Self::with_clock(rate_per_minute, burst, &DefaultClock::default())
    }
}

impl<C: Clock> RateLimiter<C> {
    pub fn with_clock(rate_per_minute: u32, burst: u32, clock: &C) -> Self {
        let quota = Quota::per_minute(non_zero(rate_per_minute)).allow_burst(non_zero(burst));
        Self {
            inner: governor::RateLimiter::direct_with_clock(quota, clock),
        }
    }

    /// Take one token if available.
    pub fn try_acquire(&self) -> bool {
        self.inner.check().is_ok()
    }
}

impl<C: Clock> std::fmt::Debug for RateLimiter<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter").finish_non_exhaustive()
    }
}

fn non_zero(value: u32) -> NonZeroU32 {
    NonZeroU32::new(value).unwrap_or(NonZeroU32::MIN)
}

pub async fn enforce_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !state.limiter.try_acquire() {
        debug!(path = %request.uri().path(), "request rejected by rate limiter");
        return Err(AppError::RateLimited);
    }
    Ok(next.run(request).await)
}
