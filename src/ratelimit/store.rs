//! Concurrent principal → record storage.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::debug;

use super::record::RateLimitRecord;
use super::tier::Tier;

/// Owns every [`RateLimitRecord`], keyed by principal.
///
/// Records live in a sharded map. A closure passed to [`RecordStore::with_record`]
/// runs while the shard holding the record is write-locked, so the
/// read-check-increment of one principal is atomic with respect to every
/// other access to that principal, including eviction.
#[derive(Debug, Default)]
pub struct RecordStore {
    records: DashMap<String, RateLimitRecord>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` on the principal's record, creating it first if needed.
    ///
    /// A new record takes `tier`; an existing record keeps the tier it was
    /// created with.
    pub fn with_record<R>(
        &self,
        principal: &str,
        tier: Tier,
        now: DateTime<Utc>,
        f: impl FnOnce(&mut RateLimitRecord) -> R,
    ) -> R {
        // Look up by &str first so the hot path does not allocate a key.
        if let Some(mut record) = self.records.get_mut(principal) {
            return f(record.value_mut());
        }

        let mut record = self.records.entry(principal.to_string()).or_insert_with(|| {
            debug!(principal = %principal, tier = %tier, "Creating new rate limit record");
            RateLimitRecord::new(principal, tier, now)
        });
        f(record.value_mut())
    }

    /// Get a copy of a principal's record.
    pub fn get(&self, principal: &str) -> Option<RateLimitRecord> {
        self.records.get(principal).map(|record| record.value().clone())
    }

    /// Delete a principal's record.
    ///
    /// Returns `true` if a record was removed.
    pub fn delete(&self, principal: &str) -> bool {
        self.records.remove(principal).is_some()
    }

    /// Copy out every record.
    ///
    /// Shards are visited one at a time, so the result is consistent per
    /// record but not a point-in-time image of the whole map.
    pub fn all(&self) -> Vec<RateLimitRecord> {
        self.records.iter().map(|record| record.value().clone()).collect()
    }

    /// Delete every record for which `evict` returns `true`.
    ///
    /// Returns the number of records removed.
    pub fn evict_where(&self, mut evict: impl FnMut(&RateLimitRecord) -> bool) -> usize {
        let mut evicted = 0;
        self.records.retain(|_, record| {
            if evict(record) {
                evicted += 1;
                false
            } else {
                true
            }
        });
        evicted
    }

    /// Number of tracked principals.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Remove every record.
    pub fn clear(&self) {
        self.records.clear();
    }
}
