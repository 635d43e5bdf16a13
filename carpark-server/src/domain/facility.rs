//! Facility identifier type.

use std::fmt;

/// Longest facility id accepted from a caller.
const MAX_LEN: usize = 32;

/// Error returned when parsing an invalid facility id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid facility id: {reason}")]
pub struct InvalidFacilityId {
    reason: &'static str,
}

/// A government-assigned carpark facility id, e.g. `"486"`.
///
/// Ids are 1 to 32 ASCII letters or digits. The upstream API only issues
/// numeric ids today, but nothing in this service depends on that.
///
/// # Examples
///
/// ```
/// use carpark_server::domain::FacilityId;
///
/// let id = FacilityId::parse("486").unwrap();
/// assert_eq!(id.as_str(), "486");
///
/// assert!(FacilityId::parse("").is_err());
/// assert!(FacilityId::parse("48 6").is_err());
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FacilityId(String);

impl FacilityId {
    /// Parse a facility id from a string.
    pub fn parse(s: &str) -> Result<Self, InvalidFacilityId> {
        if s.is_empty() {
            return Err(InvalidFacilityId {
                reason: "must not be empty",
            });
        }

        if s.len() > MAX_LEN {
            return Err(InvalidFacilityId {
                reason: "must be at most 32 characters",
            });
        }

        if !s.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(InvalidFacilityId {
                reason: "must be ASCII letters or digits",
            });
        }

        Ok(FacilityId(s.to_string()))
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for FacilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FacilityId({})", self.0)
    }
}

impl fmt::Display for FacilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
