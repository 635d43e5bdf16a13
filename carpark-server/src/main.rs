use std::process::ExitCode;
use std::sync::Arc;

use tracing::{error, info};

use carpark_server::clock::{Clock, SystemClock};
use carpark_server::config::AppConfig;
use carpark_server::logging;
use carpark_server::service::CarparkService;
use carpark_server::upstream::{RateLimiter, UpstreamClient};
use carpark_server::web::{AppState, CallerLimiter, create_router};

#[tokio::main]
async fn main() -> ExitCode {
    let config = AppConfig::from_env();
    let _log_guard = logging::init(config.as_ref().ok().map(|c| c.log_dir.as_path()));

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // One limiter for every outbound request, shared by all handlers
    let limiter = Arc::new(RateLimiter::new(
        config.max_requests_per_second,
        Arc::clone(&clock),
    ));
    let client = match UpstreamClient::new(config.upstream(), limiter) {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "failed to create upstream client");
            return ExitCode::FAILURE;
        }
    };

    let carparks = CarparkService::new(client, clock, &config.cache(), config.staleness());
    let state = AppState::new(
        carparks,
        &config.public_api_token,
        CallerLimiter::default(),
    );
    let app = create_router(state);

    let listener = match tokio::net::TcpListener::bind(config.bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(addr = %config.bind_addr, error = %e, "failed to bind");
            return ExitCode::FAILURE;
        }
    };
    info!(addr = %config.bind_addr, "carpark finder listening");
    info!("  GET /health                   - health check");
    info!("  GET /carparks/nearby          - carparks near a point");
    info!("  GET /carparks/{{facility_id}}   - availability of one carpark");

    if let Err(e) = axum::serve(listener, app).await {
        error!(error = %e, "server error");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
