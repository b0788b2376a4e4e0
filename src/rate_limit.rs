/// Inbound Rate Limiting
use crate::{
    config::RateLimitConfig,
    error::{AppError, AppResult},
};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter as GovernorLimiter,
};
use std::{num::NonZeroU32, sync::Arc, time::Duration};

/// Feedback submissions get a fraction of the API quota
const FEEDBACK_DIVISOR: u32 = 10;

/// Rate limiter manager
#[derive(Clone)]
pub struct RateLimiter {
    enabled: bool,
    api: Arc<GovernorLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    feedback: Arc<GovernorLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        let rps = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(config.burst_size).unwrap_or(rps);

        let api_quota = Quota::per_second(rps).allow_burst(burst);

        let feedback_quota = Quota::per_second(
            NonZeroU32::new(config.requests_per_second / FEEDBACK_DIVISOR)
                .unwrap_or(NonZeroU32::MIN),
        )
        .allow_burst(
            NonZeroU32::new(config.burst_size / FEEDBACK_DIVISOR).unwrap_or(NonZeroU32::MIN),
        );

        Self {
            enabled: config.enabled,
            api: Arc::new(GovernorLimiter::direct(api_quota)),
            feedback: Arc::new(GovernorLimiter::direct(feedback_quota)),
        }
    }

    /// Check rate limit for search and capability endpoints
    pub fn check_api(&self) -> AppResult<()> {
        if !self.enabled {
            return Ok(());
        }
        self.api.check().map_err(|_| AppError::RateLimitExceeded {
            retry_after: Duration::from_secs(1),
        })
    }

    /// Check rate limit for feedback submissions
    pub fn check_feedback(&self) -> AppResult<()> {
        if !self.enabled {
            return Ok(());
        }
        self.feedback.check().map_err(|_| AppError::RateLimitExceeded {
            retry_after: Duration::from_secs(1),
        })
    }
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(
    State(ctx): State<crate::context::AppContext>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let path = request.uri().path();

    if path.starts_with("/api/feedback") {
        ctx.rate_limiter.check_feedback()?;
    } else if path.starts_with("/api/") {
        ctx.rate_limiter.check_api()?;
    }

    Ok(next.run(request).await)
}
