//! Core rate limiter implementation.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use tracing::{debug, info, trace};

use super::evaluator::evaluate;
use super::result::RateLimitResult;
use super::stats::{AggregateStats, PrincipalStats, Stats};
use super::store::RecordStore;
use super::tier::{Tier, TierLimitsSource};
use crate::config::TollgateConfig;

/// Default idle time, in seconds, past the day window's expiry before a
/// record is evicted.
pub const DEFAULT_IDLE_THRESHOLD_SECS: u64 = 86_400;

/// Per-principal admission control over minute, hour and day windows.
///
/// This struct is thread-safe and meant to be built once and shared behind
/// an [`Arc`]. Every operation is synchronous and bounded in time.
pub struct RateLimiter {
    /// Rate limit records indexed by principal
    store: RecordStore,
    /// Tier → budget lookup
    tiers: RwLock<Arc<dyn TierLimitsSource>>,
    /// How long past its day window a record may sit idle
    idle_threshold: Duration,
}

impl RateLimiter {
    /// Create a new rate limiter.
    pub fn new(tiers: Arc<dyn TierLimitsSource>, idle_threshold: Duration) -> Self {
        Self {
            store: RecordStore::new(),
            tiers: RwLock::new(tiers),
            idle_threshold,
        }
    }

    /// Create a rate limiter from loaded configuration.
    pub fn from_config(config: &TollgateConfig) -> Self {
        Self::new(
            Arc::new(config.tiers.clone()),
            config.limiter.idle_threshold(),
        )
    }

    /// Swap the tier budget source.
    ///
    /// Takes effect on the next check of every principal. Existing counts
    /// are kept.
    pub fn set_tiers(&self, tiers: Arc<dyn TierLimitsSource>) {
        *self.tiers.write() = tiers;
    }

    /// Check and record one request for `principal`.
    pub fn check(&self, principal: &str, tier: Tier) -> RateLimitResult {
        self.check_at(principal, tier, Utc::now())
    }

    /// Check and record one request for `principal` at time `now`.
    ///
    /// The principal's record is created on first use. Its stored tier, not
    /// `tier`, selects the budget for as long as the record exists.
    pub fn check_at(&self, principal: &str, tier: Tier, now: DateTime<Utc>) -> RateLimitResult {
        let tiers = self.tiers.read().clone();

        let result = self.store.with_record(principal, tier, now, |record| {
            if record.tier != tier {
                debug!(
                    principal = %principal,
                    stored_tier = %record.tier,
                    requested_tier = %tier,
                    "Tier differs from stored record; keeping stored tier"
                );
            }
            let limits = tiers.limits(record.tier);
            evaluate(record, &limits, now)
        });

        trace!(
            principal = %principal,
            allowed = result.allowed,
            window = %result.window,
            remaining = result.remaining,
            "Checked rate limit"
        );

        if !result.allowed {
            debug!(
                principal = %principal,
                window = %result.window,
                limit = result.limit,
                retry_after = ?result.retry_after,
                "Rate limit exceeded"
            );
        }

        result
    }

    /// Forget everything about `principal`.
    ///
    /// The next check starts from a fresh record. Resetting an unknown
    /// principal does nothing.
    pub fn reset_user(&self, principal: &str) {
        if self.store.delete(principal) {
            debug!(principal = %principal, "Rate limit record reset");
        }
    }

    /// Get usage for one principal, or `None` if it is not tracked.
    pub fn principal_stats(&self, principal: &str) -> Option<PrincipalStats> {
        let record = self.store.get(principal)?;
        let limits = self.tiers.read().limits(record.tier);
        Some(PrincipalStats::from_record(&record, &limits))
    }

    /// Get totals across all tracked principals.
    pub fn aggregate_stats(&self) -> AggregateStats {
        AggregateStats::from_records(&self.store.all())
    }

    /// Per-principal stats when `principal` is given, aggregate otherwise.
    pub fn stats(&self, principal: Option<&str>) -> Stats {
        match principal {
            Some(principal) => Stats::Principal(self.principal_stats(principal)),
            None => Stats::Aggregate(self.aggregate_stats()),
        }
    }

    /// Evict idle records as of now.
    pub fn cleanup(&self) -> usize {
        self.cleanup_at(Utc::now())
    }

    /// Evict idle records as of `now`.
    pub fn cleanup_at(&self, now: DateTime<Utc>) -> usize {
        self.sweep(now)
    }

    /// Evict every record that has been idle for more than the idle threshold
    /// past its day window, returning how many were evicted.
    ///
    /// `now` is fixed for the whole sweep. Each record is inspected under
    /// the same shard lock `check` takes, so a record is never evicted while
    /// it is being evaluated.
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let idle_threshold = self.idle_threshold;
        let evicted = self
            .store
            .evict_where(|record| record.is_stale(now, idle_threshold));

        if evicted > 0 {
            info!(
                evicted = evicted,
                remaining = self.store.len(),
                "Evicted idle rate limit records"
            );
        } else {
            trace!("Sweep found no idle rate limit records");
        }

        evicted
    }

    /// Get the number of tracked principals.
    pub fn tracked_principals(&self) -> usize {
        self.store.len()
    }

    /// Idle threshold used by [`RateLimiter::sweep`].
    pub fn idle_threshold(&self) -> Duration {
        self.idle_threshold
    }

    /// Drop every record.
    ///
    /// This is primarily useful for testing.
    pub fn clear(&self) {
        self.store.clear();
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::from_config(&TollgateConfig::default())
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("tracked_principals", &self.store.len())
            .field("idle_threshold", &self.idle_threshold)
            .finish()
    }
}
