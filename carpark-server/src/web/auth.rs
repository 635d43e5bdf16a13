//! Caller authentication and per-caller throttling.
//!
//! Callers identify themselves with an `X-API-Key` header. Keys are
//! checked first and only an accepted key is charged against a request
//! budget, so the limiter never holds more than the configured keys.

use std::num::NonZeroU32;

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use tracing::debug;

use super::routes::AppError;
use super::state::AppState;

/// Header carrying the caller's key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Default requests per second allowed per caller key.
pub const DEFAULT_CALLER_RATE: u32 = 5;

/// Per-key inbound request limiter.
#[derive(Debug)]
pub struct CallerLimiter {
    limiter: DefaultKeyedRateLimiter<String>,
}

impl CallerLimiter {
    /// Allow `per_second` requests per second for each key.
    pub fn per_second(per_second: u32) -> Self {
        let rate = NonZeroU32::new(per_second).unwrap_or(NonZeroU32::MIN);
        Self {
            limiter: RateLimiter::keyed(Quota::per_second(rate)),
        }
    }

    /// Record a request for `key`; false if the key is over budget.
    pub fn check(&self, key: &str) -> bool {
        self.limiter.check_key(&key.to_string()).is_ok()
    }

    /// Number of keys with a tracked budget.
    pub fn len(&self) -> usize {
        self.limiter.len()
    }

    pub fn is_empty(&self) -> bool {
        self.limiter.is_empty()
    }
}

impl Default for CallerLimiter {
    fn default() -> Self {
        Self::per_second(DEFAULT_CALLER_RATE)
    }
}

fn api_key(headers: &HeaderMap) -> Option<&str> {
    headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok())
}

/// Reject callers that exceed their key's request budget.
///
/// Runs after [`require_api_key`], so every key seen here is valid.
pub async fn throttle_callers(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let over_budget = api_key(request.headers()).is_some_and(|key| !state.callers.check(key));
    if over_budget {
        debug!(path = %request.uri().path(), "caller over request budget");
        return Err(AppError::TooManyRequests);
    }
    Ok(next.run(request).await)
}

/// Reject callers without the configured public token.
pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    match api_key(request.headers()) {
        None => Err(AppError::Forbidden {
            message: "Not authenticated".to_string(),
        }),
        Some(key) if key != state.public_api_token.as_ref() => Err(AppError::Forbidden {
            message: "The API Key is invalid.".to_string(),
        }),
        Some(_) => Ok(next.run(request).await),
    }
}
