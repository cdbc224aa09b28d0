//! Timestamp parsing shared by the feed normalizer and the seen-incident
//! store.

use chrono::{DateTime, NaiveDateTime, Utc};

/// Parses an ISO 8601 timestamp.
///
/// Accepts RFC 3339 (with offset, optional fractional seconds) and naive
/// `YYYY-MM-DDTHH:MM:SS[.f]` values, which are interpreted as UTC.
#[must_use]
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(naive.and_utc());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rfc3339_with_fractional_offset() {
        let dt = parse_timestamp("2025-12-06T05:53:02.97994+00:00").unwrap();
        assert_eq!(dt.to_rfc3339(), "2025-12-06T05:53:02.979940+00:00");
    }

    #[test]
    fn converts_offsets_to_utc() {
        let dt = parse_timestamp("2025-12-06T16:34:00+11:00").unwrap();
        assert_eq!(dt.to_string(), "2025-12-06 05:34:00 UTC");
    }

    #[test]
    fn treats_naive_as_utc() {
        let dt = parse_timestamp("2025-01-15T10:30:00.123456").unwrap();
        assert_eq!(dt.to_string(), "2025-01-15 10:30:00.123456 UTC");

        let dt = parse_timestamp("2025-01-15T10:30:00").unwrap();
        assert_eq!(dt.to_string(), "2025-01-15 10:30:00 UTC");
    }

    #[test]
    fn rejects_invalid_timestamp() {
        assert!(parse_timestamp("not-a-date").is_none());
        assert!(parse_timestamp("").is_none());
    }
}
