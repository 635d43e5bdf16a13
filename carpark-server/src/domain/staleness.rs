//! Last-update timestamps and the "no update" rule.
//!
//! The API stamps each detail record with `MessageDate`, a local
//! `YYYY-MM-DDTHH:MM:SS` string with no offset. A facility whose stamp is
//! missing, unparseable, or older than the threshold is considered dead
//! and hidden from nearby searches.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use tracing::debug;

use crate::upstream::FacilityDetail;

/// Format of `MessageDate`.
const MESSAGE_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Default age after which a facility counts as not updating.
pub const DEFAULT_NO_UPDATE_HOURS: f64 = 24.0;

/// Timezone the API reports local times in.
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Australia::Sydney;

/// Parse a `MessageDate` string as a local time in `tz`.
///
/// The format is strict: an offset suffix, fractional seconds or a space
/// separator all make the value unparseable. A local time that falls in a
/// daylight-saving fold resolves to the earlier instant; one that falls in
/// a gap does not exist and is unparseable.
pub fn parse_message_date(text: &str, tz: Tz) -> Option<DateTime<Tz>> {
    let naive = match NaiveDateTime::parse_from_str(text, MESSAGE_DATE_FORMAT) {
        Ok(naive) => naive,
        Err(e) => {
            debug!(value = text, error = %e, "unparseable MessageDate");
            return None;
        }
    };
    tz.from_local_datetime(&naive).earliest()
}

/// Rule deciding when a facility's data is too old to trust.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StalenessPolicy {
    /// Maximum age in hours before a facility is stale.
    pub threshold_hours: f64,
    /// Timezone `MessageDate` is expressed in.
    pub timezone: Tz,
}

impl StalenessPolicy {
    pub fn new(threshold_hours: f64, timezone: Tz) -> Self {
        Self {
            threshold_hours,
            timezone,
        }
    }

    /// The detail's last-update time, if it has a parseable one.
    pub fn last_update(&self, detail: &FacilityDetail) -> Option<DateTime<Tz>> {
        detail
            .message_date()
            .and_then(|text| parse_message_date(text, self.timezone))
    }

    /// True when `detail` has no usable timestamp, or its timestamp is more
    /// than `threshold_hours` before `now`.
    pub fn is_stale(&self, detail: &FacilityDetail, now: DateTime<Utc>) -> bool {
        let Some(updated) = self.last_update(detail) else {
            return true;
        };
        let age = now.signed_duration_since(updated.with_timezone(&Utc));
        let age_hours = age.num_milliseconds() as f64 / 3_600_000.0;
        age_hours > self.threshold_hours
    }
}

impl Default for StalenessPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_NO_UPDATE_HOURS, DEFAULT_TIMEZONE)
    }
}
