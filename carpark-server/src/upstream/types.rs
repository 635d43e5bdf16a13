//! Carpark API response DTOs.
//!
//! The upstream API is loose about types: counts and coordinates arrive
//! as JSON numbers in some records and as strings in others. Fields are
//! therefore deserialized as [`Numeric`] and coerced on use. Other fields
//! of the wrong shape read as absent, so one odd field never prevents the
//! rest of the record from being read.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Facility id → display name, as returned by the collection endpoint.
pub type FacilityDirectory = BTreeMap<String, String>;

/// A field that should hold a number but may be encoded as text.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Numeric {
    Int(i64),
    Float(f64),
    Text(String),
    Other(Value),
}

impl Numeric {
    /// Coerce to an integer. Floats are accepted only when integral.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Numeric::Int(n) => Some(*n),
            Numeric::Float(f) if f.is_finite() && f.fract() == 0.0 => Some(*f as i64),
            Numeric::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Coerce to a finite float.
    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            Numeric::Int(n) => *n as f64,
            Numeric::Float(f) => *f,
            Numeric::Text(s) => s.trim().parse().ok()?,
            Numeric::Other(_) => return None,
        };
        value.is_finite().then_some(value)
    }

    fn describe(&self) -> String {
        match self {
            Numeric::Int(n) => n.to_string(),
            Numeric::Float(f) => f.to_string(),
            Numeric::Text(s) => format!("{s:?}"),
            Numeric::Other(v) => v.to_string(),
        }
    }
}

/// A field of a detail record could not be used.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FieldError {
    /// Required field absent
    #[error("missing field {0}")]
    Missing(&'static str),

    /// Field present but not a usable number
    #[error("field {field} is not numeric: {value}")]
    NotNumeric { field: &'static str, value: String },
}

/// Occupancy breakdown for a facility.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Occupancy {
    /// Total occupied spots.
    pub total: Option<Numeric>,
}

/// Geographic location of a facility.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FacilityLocation {
    pub latitude: Option<Numeric>,
    pub longitude: Option<Numeric>,
}

/// Per-facility record from `GET <base>?facility=<id>`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FacilityDetail {
    #[serde(default, deserialize_with = "lenient")]
    pub facility_name: Option<String>,

    /// Total number of spots.
    pub spots: Option<Numeric>,

    #[serde(default, deserialize_with = "lenient")]
    pub occupancy: Option<Occupancy>,

    #[serde(default, deserialize_with = "lenient")]
    pub location: Option<FacilityLocation>,

    /// Last update, `YYYY-MM-DDTHH:MM:SS` in the API's local timezone.
    #[serde(rename = "MessageDate", default, deserialize_with = "lenient")]
    pub message_date: Option<String>,
}

/// Read a field as `T`, or as absent if it has any other shape.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

impl FacilityDetail {
    /// Total spots, defaulting to zero when absent.
    pub fn total_spots(&self) -> Result<i64, FieldError> {
        integer_or_zero(self.spots.as_ref(), "spots")
    }

    /// Occupied spots, defaulting to zero when absent.
    pub fn occupied(&self) -> Result<i64, FieldError> {
        let total = self.occupancy.as_ref().and_then(|o| o.total.as_ref());
        integer_or_zero(total, "occupancy.total")
    }

    /// Latitude and longitude in decimal degrees.
    ///
    /// `Ok(None)` when the record has no location at all; an error when a
    /// location is present but a coordinate is missing or not numeric.
    pub fn coordinates(&self) -> Result<Option<(f64, f64)>, FieldError> {
        let Some(location) = &self.location else {
            return Ok(None);
        };
        let latitude = coordinate(location.latitude.as_ref(), "location.latitude")?;
        let longitude = coordinate(location.longitude.as_ref(), "location.longitude")?;
        Ok(Some((latitude, longitude)))
    }

    /// The raw `MessageDate`, if present and non-empty.
    pub fn message_date(&self) -> Option<&str> {
        self.message_date.as_deref().filter(|s| !s.is_empty())
    }
}

fn integer_or_zero(value: Option<&Numeric>, field: &'static str) -> Result<i64, FieldError> {
    match value {
        None => Ok(0),
        Some(n) => n.as_i64().ok_or_else(|| FieldError::NotNumeric {
            field,
            value: n.describe(),
        }),
    }
}

fn coordinate(value: Option<&Numeric>, field: &'static str) -> Result<f64, FieldError> {
    let n = value.ok_or(FieldError::Missing(field))?;
    n.as_f64().ok_or_else(|| FieldError::NotNumeric {
        field,
        value: n.describe(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn detail(value: Value) -> FacilityDetail {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn numeric_fields_accept_strings_and_numbers() {
        let d = detail(json!({
            "spots": "100",
            "occupancy": { "total": 60 },
            "location": { "latitude": "-33.81", "longitude": 151.01 },
        }));

        assert_eq!(d.total_spots(), Ok(100));
        assert_eq!(d.occupied(), Ok(60));
        assert_eq!(d.coordinates(), Ok(Some((-33.81, 151.01))));
    }

    #[test]
    fn missing_counts_default_to_zero() {
        let d = detail(json!({ "facility_name": "Tallawong" }));
        assert_eq!(d.total_spots(), Ok(0));
        assert_eq!(d.occupied(), Ok(0));
        assert_eq!(d.coordinates(), Ok(None));
    }

    #[test]
    fn non_numeric_count_is_reported() {
        let d = detail(json!({ "spots": "lots", "occupancy": { "total": 1.5 } }));
        assert_eq!(
            d.total_spots(),
            Err(FieldError::NotNumeric {
                field: "spots",
                value: "\"lots\"".into()
            })
        );
        assert!(d.occupied().is_err());
    }

    #[test]
    fn integral_float_is_an_integer() {
        assert_eq!(Numeric::Float(42.0).as_i64(), Some(42));
        assert_eq!(Numeric::Text(" 7 ".into()).as_i64(), Some(7));
        assert_eq!(Numeric::Other(json!(true)).as_i64(), None);
    }

    #[test]
    fn non_finite_coordinates_are_rejected() {
        assert_eq!(Numeric::Text("NaN".into()).as_f64(), None);
        assert_eq!(Numeric::Text("inf".into()).as_f64(), None);
    }

    #[test]
    fn partial_location_is_an_error() {
        let d = detail(json!({ "location": { "latitude": "-33.8" } }));
        assert_eq!(
            d.coordinates(),
            Err(FieldError::Missing("location.longitude"))
        );

        let d = detail(json!({ "location": { "latitude": "north", "longitude": 1 } }));
        assert!(matches!(
            d.coordinates(),
            Err(FieldError::NotNumeric { field: "location.latitude", .. })
        ));
    }

    #[test]
    fn odd_field_types_do_not_fail_the_record() {
        let d = detail(json!({
            "spots": true,
            "facility_name": "Kellyville",
            "MessageDate": "2025-06-11T10:00:00",
        }));
        assert_eq!(d.facility_name.as_deref(), Some("Kellyville"));
        assert_eq!(d.message_date(), Some("2025-06-11T10:00:00"));
        assert!(d.total_spots().is_err());
    }

    #[test]
    fn wrongly_shaped_fields_read_as_absent() {
        let d = detail(json!({
            "facility_name": 7,
            "spots": 50,
            "occupancy": [1, 2],
            "location": "Tallawong",
            "MessageDate": 20250611,
        }));
        assert_eq!(d.facility_name, None);
        assert_eq!(d.total_spots(), Ok(50));
        assert_eq!(d.occupied(), Ok(0));
        assert_eq!(d.coordinates(), Ok(None));
        assert_eq!(d.message_date(), None);
    }

    #[test]
    fn empty_message_date_is_absent() {
        let d = detail(json!({ "MessageDate": "" }));
        assert_eq!(d.message_date(), None);
    }
}
