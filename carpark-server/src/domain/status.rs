//! Occupancy status.

use std::fmt;

use serde::Serialize;

/// How full a carpark is, as shown to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum OccupancyStatus {
    #[serde(rename = "Full")]
    Full,
    #[serde(rename = "Almost Full")]
    AlmostFull,
    #[serde(rename = "Available")]
    Available,
    /// The facility reports no capacity, or nothing recent.
    #[serde(rename = "No Data Available")]
    NoData,
}

impl OccupancyStatus {
    /// Classify a facility from its capacity and occupied count.
    ///
    /// `Full` when nothing is free, `Almost Full` when at most 20% of the
    /// capacity is free, `Available` otherwise. A facility reporting zero
    /// or negative capacity has no meaningful status and yields `NoData`.
    pub fn from_counts(total_spots: i64, occupied: i64) -> Self {
        if total_spots <= 0 {
            return OccupancyStatus::NoData;
        }

        let available = total_spots.saturating_sub(occupied);
        if available <= 0 {
            OccupancyStatus::Full
        } else if available as f64 <= total_spots as f64 * 0.2 {
            OccupancyStatus::AlmostFull
        } else {
            OccupancyStatus::Available
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OccupancyStatus::Full => "Full",
            OccupancyStatus::AlmostFull => "Almost Full",
            OccupancyStatus::Available => "Available",
            OccupancyStatus::NoData => "No Data Available",
        }
    }
}

impl fmt::Display for OccupancyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
