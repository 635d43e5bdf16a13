//! NSW Transport carpark API access.
//!
//! This module provides the rate-limited HTTP client for the upstream
//! open-data API.
//!
//! Key characteristics of the upstream:
//! - A hard ceiling of 5 requests per second per API key
//! - Over-quota responses come back as either 429 or 403
//! - Counts and coordinates are sometimes strings, sometimes numbers
//! - `MessageDate` carries no offset; it is Sydney local time

mod client;
mod error;
#[cfg(test)]
pub(crate) mod fake;
mod rate_limit;
mod types;

pub use client::{DEFAULT_BASE_URL, UpstreamClient, UpstreamConfig};
pub use error::UpstreamError;
pub use rate_limit::{DEFAULT_MAX_PER_SECOND, RateLimiter};
pub use types::{FacilityDetail, FacilityDirectory, FacilityLocation, FieldError, Numeric, Occupancy};
