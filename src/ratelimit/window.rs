//! Fixed counting windows.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// One of the three windows every principal is counted against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeWindow {
    /// Per-minute budget
    Minute,
    /// Per-hour budget
    Hour,
    /// Per-day budget
    Day,
}

impl TimeWindow {
    /// All windows, in evaluation order.
    pub const ALL: [TimeWindow; 3] = [TimeWindow::Minute, TimeWindow::Hour, TimeWindow::Day];

    /// Get the duration of this time window.
    pub fn duration(&self) -> Duration {
        match self {
            TimeWindow::Minute => Duration::seconds(60),
            TimeWindow::Hour => Duration::seconds(3600),
            TimeWindow::Day => Duration::seconds(86400),
        }
    }

    /// Lowercase name, as used in logs and serialized output.
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeWindow::Minute => "minute",
            TimeWindow::Hour => "hour",
            TimeWindow::Day => "day",
        }
    }
}

impl std::fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fixed window counter.
///
/// The budget fully replenishes the first time the window is touched at or
/// after `reset_at`. Consumption before the boundary has no bearing on the
/// next window, so a full burst on either side of a boundary is admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Window {
    /// Requests admitted since the last reset
    pub count: u64,
    /// When the counter next resets
    pub reset_at: DateTime<Utc>,
}

impl Window {
    /// Create an empty window of the given kind starting at `now`.
    pub fn new(kind: TimeWindow, now: DateTime<Utc>) -> Self {
        Self {
            count: 0,
            reset_at: now + kind.duration(),
        }
    }

    /// Reset the window if it has expired.
    ///
    /// Returns `true` if a reset happened.
    pub fn maybe_reset(&mut self, kind: TimeWindow, now: DateTime<Utc>) -> bool {
        if now >= self.reset_at {
            self.count = 0;
            self.reset_at = now + kind.duration();
            true
        } else {
            false
        }
    }

    /// Whether one more request fits under `limit`.
    pub fn has_capacity(&self, limit: u64) -> bool {
        self.count < limit
    }

    /// Get the remaining quota, clamped at zero.
    pub fn remaining(&self, limit: u64) -> u64 {
        limit.saturating_sub(self.count)
    }

    /// Whole seconds until `reset_at`, rounded up.
    pub fn seconds_until_reset(&self, now: DateTime<Utc>) -> u64 {
        let delta = self.reset_at - now;
        let nanos = delta
            .num_nanoseconds()
            .unwrap_or_else(|| delta.num_milliseconds().saturating_mul(1_000_000));
        if nanos <= 0 {
            return 0;
        }
        (nanos as u64).div_ceil(1_000_000_000)
    }
}
