//! Domain types for the carpark finder.
//!
//! Pure types and functions with no I/O: facility ids, occupancy status,
//! great-circle distance, and the staleness rule applied to upstream
//! detail records.

mod distance;
mod facility;
mod staleness;
mod status;

pub use distance::{EARTH_RADIUS_KM, GeoPoint, great_circle_distance_km};
pub use facility::{FacilityId, InvalidFacilityId};
pub use staleness::{
    DEFAULT_NO_UPDATE_HOURS, DEFAULT_TIMEZONE, StalenessPolicy, parse_message_date,
};
pub use status::OccupancyStatus;
