//! HTTP route handlers.

use axum::extract::rejection::QueryRejection;
use axum::http::{HeaderName, Method, StatusCode};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

use crate::domain::{FacilityId, GeoPoint};
use crate::service::LocationsView;

use super::auth::{API_KEY_HEADER, require_api_key, throttle_callers};
use super::dto::*;
use super::state::AppState;

/// Create the application router.
///
/// Everything under `/carparks` needs an `X-API-Key`; `/health` is open.
pub fn create_router(state: AppState) -> Router {
    // Later layers run first: authenticate, then throttle.
    let carparks = Router::new()
        .route("/carparks/nearby", get(nearby_carparks))
        .route("/carparks/:facility_id", get(carpark_detail))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            throttle_callers,
        ))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_api_key,
        ));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET])
        .allow_headers([HeaderName::from_static(API_KEY_HEADER)]);

    Router::new()
        .route("/health", get(health))
        .merge(carparks)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Carparks within a radius of a point, nearest first.
async fn nearby_carparks(
    State(state): State<AppState>,
    query: Result<Query<NearbyRequest>, QueryRejection>,
) -> Result<Json<Vec<NearbyCarpark>>, AppError> {
    let Query(req) = query.map_err(|e| AppError::BadRequest {
        message: e.body_text(),
    })?;

    if !req.lat.is_finite() || !(-90.0..=90.0).contains(&req.lat) {
        return Err(AppError::BadRequest {
            message: format!("Invalid latitude: {}", req.lat),
        });
    }
    if !req.lng.is_finite() || !(-180.0..=180.0).contains(&req.lng) {
        return Err(AppError::BadRequest {
            message: format!("Invalid longitude: {}", req.lng),
        });
    }

    let radius_km = req.radius_km.unwrap_or(DEFAULT_RADIUS_KM);
    if !radius_km.is_finite() || radius_km < 0.0 {
        return Err(AppError::BadRequest {
            message: format!("Invalid radius_km: {radius_km}"),
        });
    }

    let Some(view) = state.carparks.get_locations().await else {
        warn!("locations unavailable, returning no carparks");
        return Ok(Json(Vec::new()));
    };

    let origin = GeoPoint::new(req.lat, req.lng);
    Ok(Json(find_nearby(&view, &origin, radius_km)))
}

/// Carparks in `view` no further than `radius_km` from `origin`.
///
/// Distances are rounded to two decimal places and the result is sorted by
/// rounded distance, keeping directory order for ties.
pub fn find_nearby(view: &LocationsView, origin: &GeoPoint, radius_km: f64) -> Vec<NearbyCarpark> {
    let mut nearby: Vec<NearbyCarpark> = view
        .carparks
        .iter()
        .filter_map(|carpark| {
            let distance = origin.distance_km(&carpark.location);
            (distance <= radius_km).then(|| NearbyCarpark {
                facility_id: carpark.facility_id.clone(),
                name: carpark.name.clone(),
                distance_km: (distance * 100.0).round() / 100.0,
                status: carpark.status(),
            })
        })
        .collect();

    nearby.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    nearby
}

/// Current availability of one carpark.
async fn carpark_detail(
    State(state): State<AppState>,
    Path(facility_id): Path<String>,
) -> Result<Json<CarparkDetailResponse>, AppError> {
    let facility_id = FacilityId::parse(&facility_id).map_err(|e| AppError::BadRequest {
        message: format!("Invalid facility id {facility_id:?}: {e}"),
    })?;
    let id = facility_id.as_str();

    let no_update = state.carparks.get_no_update_set().await;
    if no_update.contains(id) {
        debug!(facility_id = %id, "facility is not updating");
        return Ok(Json(CarparkDetailResponse::no_data(id)));
    }

    let detail = state
        .carparks
        .get_detail(id)
        .await
        .ok_or_else(|| AppError::NotFound {
            message: format!("Carpark with ID {id} not found"),
        })?;

    let response = CarparkDetailResponse::from_detail(id, &detail, state.carparks.staleness())
        .map_err(|e| AppError::BadGateway {
            message: format!("Carpark {id} returned unusable data: {e}"),
        })?;

    Ok(Json(response))
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    BadRequest { message: String },
    Forbidden { message: String },
    TooManyRequests,
    NotFound { message: String },
    BadGateway { message: String },
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest { message } => (StatusCode::BAD_REQUEST, message),
            AppError::Forbidden { message } => (StatusCode::FORBIDDEN, message),
            AppError::TooManyRequests => (
                StatusCode::TOO_MANY_REQUESTS,
                "Too many requests. Please try again in a second.".to_string(),
            ),
            AppError::NotFound { message } => (StatusCode::NOT_FOUND, message),
            AppError::BadGateway { message } => (StatusCode::BAD_GATEWAY, message),
        };

        if status.is_server_error() {
            warn!(%status, "{message}");
        } else {
            debug!(%status, "{message}");
        }

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}
