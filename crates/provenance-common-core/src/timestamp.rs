//! Timestamp utilities.
//!
//! Ledger timestamps are persisted and hashed as fixed-format UTC strings
//! (`YYYY-MM-DDTHH:MM:SS.ffffffZ`). A timestamp only ever has one valid
//! textual form, so parsing is strict: anything that does not round-trip
//! exactly is rejected.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A UTC timestamp with microsecond precision.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

/// Error parsing a canonical timestamp.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimestampParseError {
    /// Not an RFC 3339 timestamp at all.
    #[error("invalid timestamp '{0}'")]
    Invalid(String),

    /// Valid RFC 3339, but not in the canonical UTC form.
    #[error("timestamp '{0}' is not in canonical UTC form")]
    NotCanonical(String),
}

impl Timestamp {
    /// Current time, truncated to microseconds.
    pub fn now() -> Self {
        Self(Utc::now().trunc_subsecs(6))
    }

    /// From a DateTime (truncated to microseconds).
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt.trunc_subsecs(6))
    }

    /// Get the inner DateTime.
    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }

    /// The canonical string form used for persistence and hashing.
    pub fn to_canonical(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    /// Parse the canonical string form. Any other rendering of the same
    /// instant (offsets, different precision) is rejected.
    pub fn parse_canonical(s: &str) -> Result<Self, TimestampParseError> {
        let parsed = DateTime::parse_from_rfc3339(s)
            .map_err(|_| TimestampParseError::Invalid(s.to_string()))?;
        let ts = Self(parsed.with_timezone(&Utc));
        if ts.to_canonical() != s {
            return Err(TimestampParseError::NotCanonical(s.to_string()));
        }
        Ok(ts)
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_canonical())
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self)
    }
}

impl std::str::FromStr for Timestamp {
    type Err = TimestampParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_canonical(s)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_canonical())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse_canonical(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    #[test]
    fn test_canonical_format() {
        let dt = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        let ts = Timestamp::from_datetime(dt);
        assert_eq!(ts.to_canonical(), "2024-03-09T07:05:01.000000Z");
    }

    #[test]
    fn test_timestamp_serialization() {
        let ts = Timestamp::now();
        let json = serde_json::to_string(&ts).unwrap();
        let deserialized: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(ts, deserialized);
    }

    #[test]
    fn test_timestamp_display() {
        let display_str = Timestamp::now().to_string();
        assert!(display_str.contains('T'));
        assert!(display_str.ends_with('Z'));
    }

    #[test]
    fn test_rejects_offset_form() {
        let err = Timestamp::parse_canonical("2024-03-09T07:05:01.000000+00:00").unwrap_err();
        assert!(matches!(err, TimestampParseError::NotCanonical(_)));
    }

    #[test]
    fn test_rejects_seconds_precision() {
        let err = Timestamp::parse_canonical("2024-03-09T07:05:01Z").unwrap_err();
        assert!(matches!(err, TimestampParseError::NotCanonical(_)));
    }

    #[test]
    fn test_rejects_garbage() {
        let err = Timestamp::parse_canonical("yesterday").unwrap_err();
        assert!(matches!(err, TimestampParseError::Invalid(_)));
    }

    proptest! {
        #[test]
        fn test_canonical_roundtrip(secs in 0i64..4_102_444_800, micros in 0u32..1_000_000) {
            let dt = Utc.timestamp_opt(secs, micros * 1_000).unwrap();
            let ts = Timestamp::from_datetime(dt);
            let parsed = Timestamp::parse_canonical(&ts.to_canonical()).unwrap();
            prop_assert_eq!(ts, parsed);
        }
    }
}
