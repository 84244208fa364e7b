//! Shared primitive types used across the tick core.

use chrono::{DateTime, Utc};

/// Sequential tick number. The first committed tick is 1.
pub type TickNumber = u64;

/// Wall-clock instant. All game time is UTC.
pub type Timestamp = DateTime<Utc>;

/// A stable, unique identifier for a planet.
pub type PlanetId = String;

/// A stable, unique identifier for a fleet.
pub type FleetId = String;

/// The owning player account. Identity is managed outside the core.
pub type UserId = String;

/// Milliseconds between two instants, clamped at zero.
/// A clock that moved backwards yields no elapsed time.
pub fn elapsed_ms(from: Timestamp, to: Timestamp) -> u64 {
    (to - from).num_milliseconds().max(0) as u64
}

/// Persisted form of a timestamp (unix milliseconds).
pub fn to_millis(ts: Timestamp) -> i64 {
    ts.timestamp_millis()
}

/// Inverse of [`to_millis`]. Out-of-range values collapse to the epoch.
pub fn from_millis(ms: i64) -> Timestamp {
    DateTime::<Utc>::from_timestamp_millis(ms).unwrap_or_default()
}

/// Fresh random id for records created by external operations.
pub fn new_id(prefix: &str) -> String {
    format!("{prefix}-{}", uuid::Uuid::new_v4())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_is_clamped_when_clock_goes_backwards() {
        let a = from_millis(10_000);
        let b = from_millis(4_000);
        assert_eq!(elapsed_ms(a, b), 0);
        assert_eq!(elapsed_ms(b, a), 6_000);
    }

    #[test]
    fn millis_round_trip_preserves_instant() {
        let ts = from_millis(1_700_000_123_456);
        assert_eq!(to_millis(ts), 1_700_000_123_456);
    }
}
