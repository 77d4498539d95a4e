//! Read-only usage statistics.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use super::record::RateLimitRecord;
use super::tier::{Tier, TierLimits};
use super::window::TimeWindow;

/// Usage of one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WindowStats {
    pub current: u64,
    pub limit: u64,
    pub remaining: u64,
    pub reset_at: DateTime<Utc>,
}

/// Usage of one principal across all windows.
///
/// Counts are reported as stored. A window whose `reset_at` is already in
/// the past is reset by the next check, not by reading stats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrincipalStats {
    pub principal: String,
    pub tier: Tier,
    pub minute: WindowStats,
    pub hour: WindowStats,
    pub day: WindowStats,
}

impl PrincipalStats {
    pub fn from_record(record: &RateLimitRecord, limits: &TierLimits) -> Self {
        let window = |kind: TimeWindow| {
            let window = record.window(kind);
            let limit = limits.for_window(kind);
            WindowStats {
                current: window.count,
                limit,
                remaining: window.remaining(limit),
                reset_at: window.reset_at,
            }
        };

        Self {
            principal: record.principal.clone(),
            tier: record.tier,
            minute: window(TimeWindow::Minute),
            hour: window(TimeWindow::Hour),
            day: window(TimeWindow::Day),
        }
    }

    pub fn window(&self, kind: TimeWindow) -> &WindowStats {
        match kind {
            TimeWindow::Minute => &self.minute,
            TimeWindow::Hour => &self.hour,
            TimeWindow::Day => &self.day,
        }
    }
}

/// Totals across every tracked principal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AggregateStats {
    pub total_principals: usize,
    /// Tracked principals per tier; tiers with none are omitted
    pub count_by_tier: BTreeMap<Tier, usize>,
}

impl AggregateStats {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a RateLimitRecord>) -> Self {
        let mut stats = AggregateStats::default();
        for record in records {
            stats.total_principals += 1;
            *stats.count_by_tier.entry(record.tier).or_insert(0) += 1;
        }
        stats
    }
}

/// Answer to a stats query, per principal or in aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Stats {
    /// Stats for one principal; `None` if it is not tracked
    Principal(Option<PrincipalStats>),
    Aggregate(AggregateStats),
}
