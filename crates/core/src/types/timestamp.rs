//! Serde helpers for backend timestamps.
//!
//! The backend emits timestamps without an offset
//! (`2025-03-14T09:30:00.123456`) but RFC 3339 values are accepted too and
//! normalized to UTC.

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Deserializer};

/// Parse a backend timestamp string.
#[must_use]
pub fn parse(raw: &str) -> Option<NaiveDateTime> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.naive_utc())
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok())
        .or_else(|| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f").ok())
}

/// Deserialize a required timestamp.
///
/// # Errors
///
/// Fails when the value is not a string in a supported format.
pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
}

/// Deserialize an optional timestamp; `null`, absent, or unparseable values
/// become `None`.
///
/// # Errors
///
/// Fails only when the value is neither a string nor `null`.
pub fn deserialize_option<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_formats() {
        let naive = parse("2025-03-14T09:30:00.5").unwrap();
        assert_eq!(naive.to_string(), "2025-03-14 09:30:00.500");

        let offset = parse("2025-03-14T10:30:00+01:00").unwrap();
        assert_eq!(offset.to_string(), "2025-03-14 09:30:00");

        assert!(parse("2025-03-14 09:30:00").is_some());
        assert!(parse("yesterday").is_none());
    }
}
