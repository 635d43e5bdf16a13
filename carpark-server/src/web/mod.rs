//! Web layer for the carpark finder.
//!
//! Provides HTTP endpoints for finding carparks near a point and checking
//! the availability of one carpark.

mod auth;
mod dto;
mod routes;
mod state;

pub use auth::{API_KEY_HEADER, CallerLimiter, DEFAULT_CALLER_RATE};
pub use dto::*;
pub use routes::{AppError, create_router, find_nearby};
pub use state::AppState;
