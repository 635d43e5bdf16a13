//! Outbound request throttle.
//!
//! The carpark API allows 5 requests per wall-clock second per key. This
//! is a fixed-window counter: the window is the current Unix second, and
//! bursts straddling a boundary are allowed through.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::Mutex;
use tracing::debug;

use crate::clock::Clock;

/// Default ceiling of requests per second.
pub const DEFAULT_MAX_PER_SECOND: u32 = 5;

/// Counter state for the current window.
#[derive(Debug)]
struct Window {
    /// Requests counted in `second`.
    count: u32,
    /// Unix second the counter belongs to.
    second: i64,
}

/// Fixed-window rate limiter shared by every upstream call.
///
/// Created once and handed to the client behind an `Arc`. The
/// reset-check-increment sequence runs under a single lock, so parallel
/// callers cannot lose updates.
#[derive(Debug)]
pub struct RateLimiter {
    max_per_second: u32,
    clock: Arc<dyn Clock>,
    window: Mutex<Window>,
}

impl RateLimiter {
    /// Create a limiter allowing `max_per_second` requests per second.
    ///
    /// A ceiling of zero is treated as one.
    pub fn new(max_per_second: u32, clock: Arc<dyn Clock>) -> Self {
        let second = clock.now().timestamp();
        Self {
            max_per_second: max_per_second.max(1),
            clock,
            window: Mutex::new(Window { count: 0, second }),
        }
    }

    /// The configured ceiling.
    pub fn max_per_second(&self) -> u32 {
        self.max_per_second
    }

    /// Count one request, waiting for the next window if this one is full.
    pub async fn acquire(&self) {
        let mut window = self.window.lock().await;
        self.reset_window_if_new_second(&mut window);
        self.throttle_window_if_exceeded(&mut window).await;
        window.count += 1;
    }

    /// Zero the counter if the clock has moved into a later second.
    pub async fn reset_if_new_second(&self) {
        let mut window = self.window.lock().await;
        self.reset_window_if_new_second(&mut window);
    }

    /// Wait for the next window if the ceiling has been reached.
    pub async fn throttle_if_exceeded(&self) {
        let mut window = self.window.lock().await;
        self.throttle_window_if_exceeded(&mut window).await;
    }

    /// Unconditionally wait for the next second boundary and start a fresh
    /// window. Used to back off after the API reports throttling.
    pub async fn wait_for_next_window(&self) {
        let mut window = self.window.lock().await;
        self.advance_to_next_second(&mut window).await;
    }

    /// Requests counted in the current window.
    pub async fn count(&self) -> u32 {
        self.window.lock().await.count
    }

    /// The Unix second the current window belongs to.
    pub async fn window_second(&self) -> i64 {
        self.window.lock().await.second
    }

    fn reset_window_if_new_second(&self, window: &mut Window) {
        let current = self.clock.now().timestamp();
        if current > window.second {
            window.count = 0;
            window.second = current;
        }
    }

    async fn throttle_window_if_exceeded(&self, window: &mut Window) {
        if window.count >= self.max_per_second {
            debug!(
                count = window.count,
                second = window.second,
                "outbound limit reached, waiting for next second"
            );
            self.advance_to_next_second(window).await;
        }
    }

    async fn advance_to_next_second(&self, window: &mut Window) {
        let now = self.clock.now();
        let next_second = now.timestamp() + 1;
        tokio::time::sleep(until_second(now, next_second)).await;

        window.count = 0;
        window.second = next_second.max(window.second);
    }
}

/// Time remaining from `now` until the start of Unix second `second`.
fn until_second(now: DateTime<Utc>, second: i64) -> std::time::Duration {
    let boundary = DateTime::from_timestamp(second, 0).unwrap_or(now);
    let remaining: TimeDelta = boundary - now;
    remaining.max(TimeDelta::zero()).to_std().unwrap_or_default()
}
