//! Wall-clock timestamps for transaction validity windows

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// A point in time with nanosecond resolution, as carried in request bodies.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct Timestamp {
    /// Whole seconds since the Unix epoch
    pub seconds: u64,
    /// Additional nanoseconds, always < 1_000_000_000
    pub nanos: u32,
}

impl Timestamp {
    /// Create a timestamp from seconds and nanoseconds since the epoch
    pub fn new(seconds: u64, nanos: u32) -> Self {
        Self {
            seconds: seconds + u64::from(nanos / 1_000_000_000),
            nanos: nanos % 1_000_000_000,
        }
    }

    /// The current wall-clock time
    pub fn now() -> Self {
        // System clocks before the epoch are not a supported configuration.
        let elapsed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO);
        Self {
            seconds: elapsed.as_secs(),
            nanos: elapsed.subsec_nanos(),
        }
    }

    /// This timestamp advanced by `duration`
    pub fn plus(&self, duration: Duration) -> Self {
        Self::new(
            self.seconds + duration.as_secs(),
            self.nanos + duration.subsec_nanos(),
        )
    }

    /// This timestamp moved back by `duration`, saturating at the epoch
    pub fn minus(&self, duration: Duration) -> Self {
        let total = self.as_nanos().saturating_sub(duration.as_nanos() as u128);
        Self {
            seconds: (total / 1_000_000_000) as u64,
            nanos: (total % 1_000_000_000) as u32,
        }
    }

    /// Whether this timestamp lies strictly in the past
    pub fn is_past(&self) -> bool {
        *self < Self::now()
    }

    fn as_nanos(&self) -> u128 {
        u128::from(self.seconds) * 1_000_000_000 + u128::from(self.nanos)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}", self.seconds, self.nanos)
    }
}
