//! Global rate limiting for the API routes.
//!
//! Uses the `governor` crate's direct (unkeyed) token bucket: one quota for
//! the whole server, refilled every second.

use crate::error::AppError;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Shared limiter handle.
pub type Limiter = Arc<DefaultDirectRateLimiter>;

/// Build a limiter allowing `per_second` requests per second (burst equal
/// to the rate). `0` means no limiter.
pub fn limiter(per_second: u32) -> Option<Limiter> {
    NonZeroU32::new(per_second).map(|rate| Arc::new(RateLimiter::direct(Quota::per_second(rate))))
}

/// Middleware rejecting requests beyond the quota with `429`.
pub async fn enforce(
    State(limiter): State<Limiter>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if limiter.check().is_err() {
        return Err(AppError::RateLimited);
    }
    Ok(next.run(request).await)
}
