//! Application state for the web layer.

use std::sync::Arc;

use crate::service::CarparkService;

use super::auth::CallerLimiter;

/// Shared application state.
///
/// Contains all the services needed to handle requests.
#[derive(Clone)]
pub struct AppState {
    /// Cached carpark API access
    pub carparks: Arc<CarparkService>,

    /// Token callers must present in `X-API-Key`
    pub public_api_token: Arc<str>,

    /// Per-caller request budgets
    pub callers: Arc<CallerLimiter>,
}

impl AppState {
    /// Create a new app state.
    pub fn new(carparks: CarparkService, public_api_token: &str, callers: CallerLimiter) -> Self {
        Self {
            carparks: Arc::new(carparks),
            public_api_token: Arc::from(public_api_token),
            callers: Arc::new(callers),
        }
    }
}
