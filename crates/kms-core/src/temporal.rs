//! # Temporal Types: UTC Millisecond Timestamps
//!
//! `Timestamp` is a UTC-only instant truncated to millisecond precision,
//! matching the resolution at which material-key generation dates are
//! recorded. Because that resolution is coarse, two keys generated in quick
//! succession can share a timestamp; the key selector breaks such ties on
//! the material key identifier rather than relying on clock resolution.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// A UTC timestamp, truncated to milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// The current UTC time, truncated to milliseconds.
    pub fn now() -> Self {
        Self::from_utc(Utc::now())
    }

    /// Wrap a `DateTime<Utc>`, truncating sub-millisecond precision.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(dt.trunc_subsecs(3))
    }

    /// Milliseconds since the Unix epoch.
    pub fn unix_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }

    /// Access the inner `DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%dT%H:%M:%S%.3fZ"))
    }
}
