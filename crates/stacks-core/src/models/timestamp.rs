//! Fixed-format timestamp text used in snapshots
//!
//! `yyyy-MM-ddTHH:mm:ss.SSS+hhmm`, millisecond precision with an explicit offset.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Deserializer, Serializer};

/// Format string for serialized timestamps
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%z";

/// Render a timestamp in the snapshot format.
#[must_use]
pub fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a timestamp in the snapshot format, also accepting RFC 3339.
pub fn parse_timestamp(raw: &str) -> crate::Result<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .map(|parsed| parsed.with_timezone(&Utc).trunc_subsecs(3))
        .map_err(|error| crate::Error::ParseFailure(format!("invalid timestamp {raw:?}: {error}")))
}

/// Convert unix milliseconds to a timestamp, falling back to the epoch.
#[must_use]
pub fn from_millis(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_default()
}

pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format_timestamp(value))
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).map_err(serde::de::Error::custom)
}
