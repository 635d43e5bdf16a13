//! Data transfer objects for web requests and responses.

use serde::{Deserialize, Serialize};

use crate::domain::{OccupancyStatus, StalenessPolicy};
use crate::upstream::{FacilityDetail, FieldError};

/// Default search radius in kilometres.
pub const DEFAULT_RADIUS_KM: f64 = 10.0;

/// Query for carparks around a point.
#[derive(Debug, Deserialize)]
pub struct NearbyRequest {
    /// Latitude of the search point
    pub lat: f64,

    /// Longitude of the search point
    pub lng: f64,

    /// Search radius in kilometres (defaults to 10)
    pub radius_km: Option<f64>,
}

/// A carpark within the search radius.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearbyCarpark {
    pub facility_id: String,

    pub name: String,

    /// Distance from the search point, rounded to 10 m
    pub distance_km: f64,

    /// Occupancy when the locations view was last built
    pub status: OccupancyStatus,
}

/// Availability of one carpark.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CarparkDetailResponse {
    pub facility_id: String,

    /// Facility name, or "Unknown"
    pub name: String,

    pub total_spots: i64,

    pub available_spots: i64,

    pub status: OccupancyStatus,

    /// Last update from the facility, RFC 3339 with offset
    pub timestamp: Option<String>,
}

impl CarparkDetailResponse {
    /// Placeholder for a facility known not to be updating.
    pub fn no_data(facility_id: &str) -> Self {
        Self {
            facility_id: facility_id.to_string(),
            name: "Unknown".to_string(),
            total_spots: 0,
            available_spots: 0,
            status: OccupancyStatus::NoData,
            timestamp: None,
        }
    }

    /// Build from a fetched detail record.
    ///
    /// A record without a usable `MessageDate` reports its capacity but no
    /// availability. Malformed counts are an error.
    pub fn from_detail(
        facility_id: &str,
        detail: &FacilityDetail,
        policy: &StalenessPolicy,
    ) -> Result<Self, FieldError> {
        let total_spots = detail.total_spots()?;
        let occupied = detail.occupied()?;
        let name = detail
            .facility_name
            .clone()
            .unwrap_or_else(|| "Unknown".to_string());

        let response = match policy.last_update(detail) {
            None => Self {
                facility_id: facility_id.to_string(),
                name,
                total_spots,
                available_spots: 0,
                status: OccupancyStatus::NoData,
                timestamp: None,
            },
            Some(updated) => Self {
                facility_id: facility_id.to_string(),
                name,
                total_spots,
                available_spots: total_spots.saturating_sub(occupied),
                status: OccupancyStatus::from_counts(total_spots, occupied),
                timestamp: Some(updated.to_rfc3339()),
            },
        };
        Ok(response)
    }
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn detail(value: serde_json::Value) -> FacilityDetail {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn from_detail_with_timestamp() {
        let d = detail(json!({
            "facility_name": "Park&Ride - Tallawong",
            "spots": "100",
            "occupancy": { "total": "60" },
            "MessageDate": "2025-06-11T10:00:00",
        }));

        let response =
            CarparkDetailResponse::from_detail("486", &d, &StalenessPolicy::default()).unwrap();

        assert_eq!(response.name, "Park&Ride - Tallawong");
        assert_eq!(response.total_spots, 100);
        assert_eq!(response.available_spots, 40);
        assert_eq!(response.status, OccupancyStatus::Available);
        assert_eq!(
            response.timestamp.as_deref(),
            Some("2025-06-11T10:00:00+10:00")
        );
    }

    #[test]
    fn from_detail_without_timestamp_has_no_data() {
        let d = detail(json!({ "spots": 50, "occupancy": { "total": 10 } }));

        let response =
            CarparkDetailResponse::from_detail("1", &d, &StalenessPolicy::default()).unwrap();

        assert_eq!(response.name, "Unknown");
        assert_eq!(response.total_spots, 50);
        assert_eq!(response.available_spots, 0);
        assert_eq!(response.status, OccupancyStatus::NoData);
        assert_eq!(response.timestamp, None);
    }

    #[test]
    fn unparseable_timestamp_is_no_data() {
        let d = detail(json!({ "spots": 50, "MessageDate": "2025-06-11 10:00" }));

        let response =
            CarparkDetailResponse::from_detail("1", &d, &StalenessPolicy::default()).unwrap();

        assert_eq!(response.status, OccupancyStatus::NoData);
        assert_eq!(response.timestamp, None);
    }

    #[test]
    fn malformed_counts_are_rejected() {
        let d = detail(json!({ "spots": "many", "MessageDate": "2025-06-11T10:00:00" }));
        assert!(CarparkDetailResponse::from_detail("1", &d, &StalenessPolicy::default()).is_err());
    }

    #[test]
    fn extreme_counts_saturate() {
        let d = detail(json!({
            "spots": "100",
            "occupancy": { "total": "-9223372036854775808" },
            "MessageDate": "2025-06-11T10:00:00",
        }));

        let response =
            CarparkDetailResponse::from_detail("1", &d, &StalenessPolicy::default()).unwrap();

        assert_eq!(response.available_spots, i64::MAX);
        assert_eq!(response.status, OccupancyStatus::Available);
    }

    #[test]
    fn no_data_placeholder_serializes() {
        let value = serde_json::to_value(CarparkDetailResponse::no_data("222")).unwrap();
        assert_eq!(
            value,
            json!({
                "facility_id": "222",
                "name": "Unknown",
                "total_spots": 0,
                "available_spots": 0,
                "status": "No Data Available",
                "timestamp": null,
            })
        );
    }
}
