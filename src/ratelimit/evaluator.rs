//! Admission decisions over a principal's three windows.
//!
//! Evaluation is pure arithmetic on a [`RateLimitRecord`]: it never fails
//! and runs in constant time. Callers are responsible for holding whatever
//! lock guards the record for the whole call.

use chrono::{DateTime, Utc};

use super::record::RateLimitRecord;
use super::result::RateLimitResult;
use super::tier::TierLimits;
use super::window::TimeWindow;

/// Per-window view computed during evaluation.
#[derive(Debug, Clone, Copy)]
struct WindowCheck {
    kind: TimeWindow,
    allowed: bool,
    limit: u64,
    remaining: u64,
    reset_at: DateTime<Utc>,
}

/// Evaluate one request against `record` at time `now`.
///
/// Expired windows are reset first, each independently. If any window is
/// out of budget the request is denied without consuming anything, and the
/// denied window that resets soonest is reported. Otherwise every window is
/// charged one request and the window with the fewest remaining requests is
/// reported, ties going to the shorter window.
pub fn evaluate(record: &mut RateLimitRecord, limits: &TierLimits, now: DateTime<Utc>) -> RateLimitResult {
    for kind in TimeWindow::ALL {
        record.window_mut(kind).maybe_reset(kind, now);
    }

    let checks = TimeWindow::ALL.map(|kind| check_window(record, limits, kind));

    // min_by_key keeps the first of equal elements, so ties go minute → hour → day.
    if let Some(blocking) = checks
        .iter()
        .filter(|check| !check.allowed)
        .min_by_key(|check| check.reset_at)
    {
        let retry_after = record.window(blocking.kind).seconds_until_reset(now);
        return RateLimitResult {
            allowed: false,
            window: blocking.kind,
            limit: blocking.limit,
            remaining: blocking.remaining,
            reset_at: blocking.reset_at,
            retry_after: Some(retry_after),
        };
    }

    for kind in TimeWindow::ALL {
        record.window_mut(kind).count += 1;
    }

    let tightest = TimeWindow::ALL
        .map(|kind| check_window(record, limits, kind))
        .into_iter()
        .min_by_key(|check| check.remaining)
        .unwrap_or(checks[0]);

    RateLimitResult {
        allowed: true,
        window: tightest.kind,
        limit: tightest.limit,
        remaining: tightest.remaining,
        reset_at: tightest.reset_at,
        retry_after: None,
    }
}

fn check_window(record: &RateLimitRecord, limits: &TierLimits, kind: TimeWindow) -> WindowCheck {
    let window = record.window(kind);
    let limit = limits.for_window(kind);
    WindowCheck {
        kind,
        allowed: window.has_capacity(limit),
        limit,
        remaining: window.remaining(limit),
        reset_at: window.reset_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::tier::Tier;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn counts(record: &RateLimitRecord) -> (u64, u64, u64) {
        (record.minute.count, record.hour.count, record.day.count)
    }

    #[test]
    fn test_admission_consumes_all_windows() {
        let limits = TierLimits::new(10, 100, 1000);
        let mut record = RateLimitRecord::new("alice", Tier::Free, t0());

        let result = evaluate(&mut record, &limits, t0());

        assert!(result.allowed);
        assert_eq!(result.retry_after, None);
        assert_eq!(counts(&record), (1, 1, 1));
    }

    #[test]
    fn test_denial_consumes_nothing() {
        let limits = TierLimits::new(2, 100, 1000);
        let mut record = RateLimitRecord::new("alice", Tier::Free, t0());
        evaluate(&mut record, &limits, t0());
        evaluate(&mut record, &limits, t0());

        let before = record.clone();
        let result = evaluate(&mut record, &limits, t0() + Duration::seconds(1));

        assert!(!result.allowed);
        assert_eq!(record, before);
    }

    #[test]
    fn test_admission_reports_closest_to_exhaustion() {
        let limits = TierLimits::new(10, 1000, 10000);
        let mut record = RateLimitRecord::new("alice", Tier::Free, t0());
        record.minute.count = 9;
        record.hour.count = 1;
        record.day.count = 1;

        let result = evaluate(&mut record, &limits, t0() + Duration::seconds(10));

        assert!(result.allowed);
        assert_eq!(result.window, TimeWindow::Minute);
        assert_eq!(result.limit, 10);
        assert_eq!(result.remaining, 0);
        assert_eq!(result.reset_at, record.minute.reset_at);
    }

    #[test]
    fn test_admission_can_report_longer_window() {
        // The day budget is nearly spent even though the minute is fresh.
        let limits = TierLimits::new(10, 1000, 10000);
        let mut record = RateLimitRecord::new("alice", Tier::Free, t0());
        record.day.count = 9998;

        let result = evaluate(&mut record, &limits, t0());

        assert_eq!(result.window, TimeWindow::Day);
        assert_eq!(result.remaining, 1);
    }

    #[test]
    fn test_admission_tie_prefers_shorter_window() {
        let limits = TierLimits::new(5, 5, 5);
        let mut record = RateLimitRecord::new("alice", Tier::Free, t0());

        let result = evaluate(&mut record, &limits, t0());

        assert_eq!(result.window, TimeWindow::Minute);
        assert_eq!(result.remaining, 4);
    }

    #[test]
    fn test_denial_reports_soonest_reset() {
        let limits = TierLimits::new(10, 1000, 50);
        let now = t0() + Duration::seconds(55);
        let mut record = RateLimitRecord::new("alice", Tier::Free, t0());
        record.minute.count = 10;
        record.day.count = 50;
        record.day.reset_at = now + Duration::seconds(3600);

        let result = evaluate(&mut record, &limits, now);

        assert!(!result.allowed);
        assert_eq!(result.window, TimeWindow::Minute);
        assert_eq!(result.reset_at, t0() + Duration::seconds(60));
        assert_eq!(result.retry_after, Some(5));
        assert_eq!(result.remaining, 0);
    }

    #[test]
    fn test_denial_reports_soonest_even_if_larger_limit() {
        // Hour expires before day here, so the hour window is reported even
        // though the day budget is smaller.
        let limits = TierLimits::new(100, 20, 10);
        let now = t0() + Duration::minutes(59);
        let mut record = RateLimitRecord::new("alice", Tier::Free, t0());
        record.hour.count = 20;
        record.day.count = 10;

        let result = evaluate(&mut record, &limits, now);

        assert!(!result.allowed);
        assert_eq!(result.window, TimeWindow::Hour);
        assert_eq!(result.limit, 20);
        assert_eq!(result.retry_after, Some(60));
    }

    #[test]
    fn test_minute_reset_leaves_other_windows_alone() {
        let limits = TierLimits::new(3, 1000, 10000);
        let mut record = RateLimitRecord::new("alice", Tier::Free, t0());
        for _ in 0..3 {
            evaluate(&mut record, &limits, t0());
        }
        let hour = record.hour;
        let day = record.day;

        let later = t0() + Duration::seconds(61);
        let result = evaluate(&mut record, &limits, later);

        assert!(result.allowed);
        assert_eq!(record.minute.count, 1);
        assert_eq!(record.minute.reset_at, later + Duration::seconds(60));
        assert_eq!(record.hour.count, hour.count + 1);
        assert_eq!(record.hour.reset_at, hour.reset_at);
        assert_eq!(record.day.count, day.count + 1);
        assert_eq!(record.day.reset_at, day.reset_at);
    }

    #[test]
    fn test_minute_window_resets_many_times_within_day() {
        let limits = TierLimits::new(1, 1000, 10000);
        let mut record = RateLimitRecord::new("alice", Tier::Free, t0());
        let day_reset = record.day.reset_at;

        for i in 0..30 {
            let now = t0() + Duration::minutes(i);
            assert!(evaluate(&mut record, &limits, now).allowed, "minute {} should admit", i);
            assert!(!evaluate(&mut record, &limits, now).allowed);
        }

        assert_eq!(record.day.count, 30);
        assert_eq!(record.day.reset_at, day_reset);
    }

    #[test]
    fn test_remaining_never_negative_when_over_limit() {
        // Counts above the limit can appear if limits are lowered.
        let limits = TierLimits::new(5, 100, 1000);
        let mut record = RateLimitRecord::new("alice", Tier::Free, t0());
        record.minute.count = 9;

        let result = evaluate(&mut record, &limits, t0());

        assert!(!result.allowed);
        assert_eq!(result.remaining, 0);
    }

    #[test]
    fn test_fixed_window_boundary_burst() {
        let limits = TierLimits::new(100, 100_000, 1_000_000);
        let mut record = RateLimitRecord::new("alice", Tier::Free, t0());
        let boundary = record.minute.reset_at;

        let before = boundary - Duration::milliseconds(1);
        for _ in 0..100 {
            assert!(evaluate(&mut record, &limits, before).allowed);
        }
        assert!(!evaluate(&mut record, &limits, before).allowed);

        let after = boundary + Duration::milliseconds(1);
        for _ in 0..100 {
            assert!(evaluate(&mut record, &limits, after).allowed);
        }
        assert_eq!(record.hour.count, 200);
    }
}
