//! Per-principal rate limit state.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::tier::Tier;
use super::window::{TimeWindow, Window};

/// All counting state held for one principal.
///
/// The tier is fixed when the record is created and stays in force until
/// the record is deleted, even if later checks name a different tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateLimitRecord {
    pub principal: String,
    pub tier: Tier,
    pub minute: Window,
    pub hour: Window,
    pub day: Window,
}

impl RateLimitRecord {
    /// Create a fresh record with every window empty.
    pub fn new(principal: impl Into<String>, tier: Tier, now: DateTime<Utc>) -> Self {
        Self {
            principal: principal.into(),
            tier,
            minute: Window::new(TimeWindow::Minute, now),
            hour: Window::new(TimeWindow::Hour, now),
            day: Window::new(TimeWindow::Day, now),
        }
    }

    pub fn window(&self, kind: TimeWindow) -> &Window {
        match kind {
            TimeWindow::Minute => &self.minute,
            TimeWindow::Hour => &self.hour,
            TimeWindow::Day => &self.day,
        }
    }

    pub fn window_mut(&mut self, kind: TimeWindow) -> &mut Window {
        match kind {
            TimeWindow::Minute => &mut self.minute,
            TimeWindow::Hour => &mut self.hour,
            TimeWindow::Day => &mut self.day,
        }
    }

    /// Whether the principal has been idle long enough to be evicted.
    ///
    /// A record is stale once `now` is more than `idle_threshold` past the
    /// expiry of its day window. A cutoff past the representable range is
    /// never reached.
    pub fn is_stale(&self, now: DateTime<Utc>, idle_threshold: chrono::Duration) -> bool {
        self.day
            .reset_at
            .checked_add_signed(idle_threshold)
            .is_some_and(|cutoff| now > cutoff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_new_record_windows() {
        let record = RateLimitRecord::new("alice", Tier::Free, t0());

        assert_eq!(record.principal, "alice");
        assert_eq!(record.tier, Tier::Free);
        for kind in TimeWindow::ALL {
            let window = record.window(kind);
            assert_eq!(window.count, 0);
            assert_eq!(window.reset_at, t0() + kind.duration());
        }
    }

    #[test]
    fn test_window_mut_targets_one_window() {
        let mut record = RateLimitRecord::new("alice", Tier::Free, t0());
        record.window_mut(TimeWindow::Hour).count = 3;

        assert_eq!(record.minute.count, 0);
        assert_eq!(record.hour.count, 3);
        assert_eq!(record.day.count, 0);
    }

    #[test]
    fn test_staleness_boundary() {
        let record = RateLimitRecord::new("alice", Tier::Free, t0());
        let threshold = Duration::hours(24);
        let cutoff = record.day.reset_at + threshold;

        assert!(!record.is_stale(t0(), threshold));
        assert!(!record.is_stale(record.day.reset_at + Duration::seconds(1), threshold));
        assert!(!record.is_stale(cutoff, threshold));
        assert!(record.is_stale(cutoff + Duration::seconds(1), threshold));
    }

    #[test]
    fn test_huge_threshold_is_never_stale() {
        let record = RateLimitRecord::new("alice", Tier::Free, t0());
        let threshold = Duration::days(100_000_000);

        assert!(!record.is_stale(t0() + Duration::days(365 * 1000), threshold));
    }
}
