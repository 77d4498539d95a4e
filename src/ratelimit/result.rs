//! Admission decisions.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::window::TimeWindow;

pub const HEADER_LIMIT: &str = "X-RateLimit-Limit";
pub const HEADER_REMAINING: &str = "X-RateLimit-Remaining";
pub const HEADER_RESET: &str = "X-RateLimit-Reset";
pub const HEADER_RETRY_AFTER: &str = "Retry-After";

/// The outcome of a rate limit check.
///
/// `limit`, `remaining` and `reset_at` describe the single window named by
/// `window`: on denial the blocking window that recovers first, on
/// admission the window closest to exhaustion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateLimitResult {
    pub allowed: bool,
    pub window: TimeWindow,
    pub limit: u64,
    pub remaining: u64,
    pub reset_at: DateTime<Utc>,
    /// Seconds to wait before retrying; only set when denied
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

impl RateLimitResult {
    /// Render the conventional throttling headers for this decision.
    ///
    /// `X-RateLimit-Reset` is a Unix timestamp in seconds. `Retry-After`
    /// is only present on denial.
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = vec![
            (HEADER_LIMIT, self.limit.to_string()),
            (HEADER_REMAINING, self.remaining.to_string()),
            (HEADER_RESET, self.reset_at.timestamp().to_string()),
        ];
        if let Some(retry_after) = self.retry_after {
            headers.push((HEADER_RETRY_AFTER, retry_after.to_string()));
        }
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn reset_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 1, 0).unwrap()
    }

    #[test]
    fn test_headers_when_allowed() {
        let result = RateLimitResult {
            allowed: true,
            window: TimeWindow::Minute,
            limit: 10,
            remaining: 4,
            reset_at: reset_at(),
            retry_after: None,
        };

        let headers = result.headers();
        assert_eq!(headers.len(), 3);
        assert_eq!(headers[0], (HEADER_LIMIT, "10".to_string()));
        assert_eq!(headers[1], (HEADER_REMAINING, "4".to_string()));
        assert_eq!(headers[2], (HEADER_RESET, reset_at().timestamp().to_string()));
    }

    #[test]
    fn test_headers_when_denied() {
        let result = RateLimitResult {
            allowed: false,
            window: TimeWindow::Hour,
            limit: 100,
            remaining: 0,
            reset_at: reset_at(),
            retry_after: Some(42),
        };

        let headers = result.headers();
        assert_eq!(headers.len(), 4);
        assert_eq!(headers[3], (HEADER_RETRY_AFTER, "42".to_string()));
    }

    #[test]
    fn test_retry_after_omitted_from_json_when_allowed() {
        let result = RateLimitResult {
            allowed: true,
            window: TimeWindow::Day,
            limit: 500,
            remaining: 499,
            reset_at: reset_at(),
            retry_after: None,
        };

        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("retry_after").is_none());
        assert_eq!(json["window"], "day");
    }
}
