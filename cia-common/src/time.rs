//! Timestamp utilities
//!
//! Timestamps are stored in SQLite as RFC 3339 text.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::{Error, Result};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Format a timestamp for storage (millisecond precision, `Z` suffix)
pub fn to_rfc3339(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a stored timestamp
pub fn parse_rfc3339(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Invalid timestamp '{}': {}", s, e)))
}

/// Parse an optional stored timestamp
pub fn parse_optional(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
    s.as_deref().map(parse_rfc3339).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_now_returns_valid_timestamp() {
        let timestamp = now();
        assert!(timestamp.timestamp() > 946_684_800); // 2000-01-01 00:00:00 UTC
    }

    #[tokio::test]
    async fn test_now_successive_calls_advance() {
        let time1 = now();
        tokio::time::sleep(Duration::from_millis(10)).await;
        let time2 = now();
        assert!(time2 > time1);
    }

    #[test]
    fn test_rfc3339_roundtrip_keeps_millis() {
        let ts = parse_rfc3339("2026-03-14T09:26:53.589Z").unwrap();
        assert_eq!(to_rfc3339(&ts), "2026-03-14T09:26:53.589Z");
    }

    #[test]
    fn test_parse_offset_normalizes_to_utc() {
        let ts = parse_rfc3339("2026-03-14T10:00:00+02:00").unwrap();
        assert_eq!(to_rfc3339(&ts), "2026-03-14T08:00:00.000Z");
    }

    #[test]
    fn test_parse_invalid() {
        assert!(parse_rfc3339("yesterday").is_err());
        assert!(parse_optional(None).unwrap().is_none());
    }
}
