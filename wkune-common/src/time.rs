//! Timestamp utilities
//!
//! Timestamps are carried as `DateTime<Utc>` in memory and stored as Unix
//! epoch milliseconds so the store can compare them numerically.

use chrono::{DateTime, Duration, TimeZone, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Convert a timestamp to Unix epoch milliseconds for storage
pub fn to_millis(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

/// Convert stored Unix epoch milliseconds back to a timestamp
///
/// Out-of-range values clamp to the epoch rather than failing; a corrupt
/// timestamp only makes a record look stale.
pub fn from_millis(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .unwrap_or_default()
}

/// True if `ts` lies strictly more than `window` before `now`
pub fn is_older_than(ts: DateTime<Utc>, window: Duration, now: DateTime<Utc>) -> bool {
    now.signed_duration_since(ts) > window
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_returns_valid_timestamp() {
        let timestamp = now();
        // Should be a reasonable timestamp (after year 2000)
        assert!(timestamp.timestamp() > 946_684_800); // 2000-01-01 00:00:00 UTC
    }

    #[tokio::test]
    async fn test_now_successive_calls_advance() {
        let time1 = now();
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        let time2 = now();
        assert!(time2 > time1);
    }

    #[test]
    fn test_millis_conversion_is_exact() {
        let ts = from_millis(1_760_000_123_456);
        assert_eq!(to_millis(ts), 1_760_000_123_456);
    }

    #[test]
    fn test_from_millis_out_of_range_clamps_to_epoch() {
        assert_eq!(from_millis(i64::MAX), DateTime::<Utc>::default());
    }

    #[test]
    fn test_is_older_than_is_strict() {
        let base = from_millis(1_000_000);
        let window = Duration::seconds(120);
        assert!(!is_older_than(base, window, base + Duration::seconds(120)));
        assert!(is_older_than(base, window, base + Duration::seconds(121)));
        assert!(!is_older_than(base, window, base));
    }
}
