//! Timestamp type and the clock abstraction used for every temporal check.
//!
//! Timestamps are Unix epoch seconds (UTC). External text formats (RFC 3339
//! from the web front end, fractional seconds from the indexer) are parsed
//! once at the boundary and never re-parsed afterwards.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::VotegateError;

/// A Unix timestamp in seconds since epoch (UTC).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    /// The epoch (time zero).
    pub const EPOCH: Self = Self(0);

    pub fn new(secs: u64) -> Self {
        Self(secs)
    }

    /// Get the current system time as a `Timestamp`.
    pub fn now() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self(secs)
    }

    /// Parse an RFC 3339 string such as `2025-06-01T12:00:00Z`.
    ///
    /// Instants before the epoch are rejected.
    pub fn from_rfc3339(s: &str) -> Result<Self, VotegateError> {
        let parsed = DateTime::parse_from_rfc3339(s.trim())
            .map_err(|e| VotegateError::InvalidTimestamp(format!("{s}: {e}")))?;
        let secs = parsed.timestamp();
        u64::try_from(secs)
            .map(Self)
            .map_err(|_| VotegateError::InvalidTimestamp(format!("{s}: before epoch")))
    }

    /// Build from fractional seconds; the fraction is truncated and negative
    /// or non-finite input clamps to the epoch.
    pub fn from_secs_f64(secs: f64) -> Self {
        if secs.is_finite() && secs > 0.0 {
            Self(secs as u64)
        } else {
            Self::EPOCH
        }
    }

    pub fn as_secs(&self) -> u64 {
        self.0
    }

    /// Format as RFC 3339 with second precision (`...Z`).
    pub fn to_rfc3339(&self) -> String {
        i64::try_from(self.0)
            .ok()
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
            .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
            .unwrap_or_else(|| self.0.to_string())
    }

    pub fn saturating_add(&self, secs: u64) -> Self {
        Self(self.0.saturating_add(secs))
    }

    pub fn saturating_sub(&self, secs: u64) -> Self {
        Self(self.0.saturating_sub(secs))
    }

    /// Seconds elapsed since this timestamp (relative to `now`).
    pub fn elapsed_since(&self, now: Timestamp) -> u64 {
        now.0.saturating_sub(self.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}

/// Source of the current time.
///
/// Injected everywhere a status or voting-window decision is made so tests
/// can move time deterministically.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall-clock time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rfc3339_utc_and_offsets() {
        let utc = Timestamp::from_rfc3339("2024-01-01T00:00:00Z").unwrap();
        assert_eq!(utc.as_secs(), 1_704_067_200);

        let offset = Timestamp::from_rfc3339("2024-01-01T03:00:00+03:00").unwrap();
        assert_eq!(offset, utc);
    }

    #[test]
    fn rejects_garbage_and_pre_epoch() {
        assert!(matches!(
            Timestamp::from_rfc3339("yesterday"),
            Err(VotegateError::InvalidTimestamp(_))
        ));
        assert!(Timestamp::from_rfc3339("1969-12-31T23:59:59Z").is_err());
    }

    #[test]
    fn rfc3339_output_is_second_precision() {
        let ts = Timestamp::new(1_704_067_200);
        assert_eq!(ts.to_rfc3339(), "2024-01-01T00:00:00Z");
    }

    #[test]
    fn fractional_seconds_truncate() {
        assert_eq!(Timestamp::from_secs_f64(1_700_000_000.9).as_secs(), 1_700_000_000);
        assert_eq!(Timestamp::from_secs_f64(-5.0), Timestamp::EPOCH);
        assert_eq!(Timestamp::from_secs_f64(f64::NAN), Timestamp::EPOCH);
    }

    #[test]
    fn saturating_arithmetic() {
        let ts = Timestamp::new(10);
        assert_eq!(ts.saturating_sub(20), Timestamp::EPOCH);
        assert_eq!(Timestamp::new(u64::MAX).saturating_add(1).as_secs(), u64::MAX);
        assert_eq!(ts.elapsed_since(Timestamp::new(25)), 15);
    }

    #[test]
    fn system_clock_is_past_2020() {
        assert!(SystemClock.now().as_secs() > 1_577_836_800);
    }
}
