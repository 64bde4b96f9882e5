//! Cache Statistics Module
//!
//! Counts lookup outcomes and store degradations of one cache instance.

use serde::Serialize;

// == Miss Reason ==
/// Why a lookup had to recompute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MissReason {
    /// No entry for the key
    Absent,
    /// An entry existed but its TTL or call budget ran out
    Stale,
    /// The store failed to produce the entry (I/O, decode, wrong password)
    Unreadable,
}

// == Cache Stats ==
/// Counters reported by [`crate::Cache::stats`].
///
/// `misses` is the total; the per-reason fields break it down, with
/// absent-key misses being the remainder (see [`CacheStats::absent_misses`]).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Misses on entries that expired by TTL or NOC
    pub stale_misses: u64,
    /// Misses caused by a store fault
    pub unreadable_misses: u64,
    /// Entries dropped to stay within `cache_size`
    pub evictions: u64,
    /// Store faults of any operation, each downgraded to a miss or a no-op
    pub persistence_failures: u64,
    /// Entries held when the snapshot was taken
    pub entries: usize,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fraction of lookups answered from the cache, 0.0 before any lookup.
    pub fn hit_rate(&self) -> f64 {
        match self.hits + self.misses {
            0 => 0.0,
            lookups => self.hits as f64 / lookups as f64,
        }
    }

    /// Misses on keys that had no entry at all.
    pub fn absent_misses(&self) -> u64 {
        self.misses - self.stale_misses - self.unreadable_misses
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    // == Record Miss ==
    /// Counts a miss under its reason.
    pub fn record_miss(&mut self, reason: MissReason) {
        self.misses += 1;
        match reason {
            MissReason::Absent => {}
            MissReason::Stale => self.stale_misses += 1,
            MissReason::Unreadable => self.unreadable_misses += 1,
        }
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn record_persistence_failure(&mut self) {
        self.persistence_failures += 1;
    }

    /// Copy of the counters with the current entry count filled in.
    pub fn snapshot(&self, entries: usize) -> Self {
        Self {
            entries,
            ..self.clone()
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_miss_breakdown() {
        let mut stats = CacheStats::new();
        stats.record_miss(MissReason::Absent);
        stats.record_miss(MissReason::Absent);
        stats.record_miss(MissReason::Stale);
        stats.record_miss(MissReason::Unreadable);

        assert_eq!(stats.misses, 4);
        assert_eq!(stats.stale_misses, 1);
        assert_eq!(stats.unreadable_misses, 1);
        assert_eq!(stats.absent_misses(), 2);
    }

    #[test]
    fn test_hit_rate() {
        let mut stats = CacheStats::new();
        assert_eq!(stats.hit_rate(), 0.0);

        stats.record_hit();
        stats.record_hit();
        stats.record_hit();
        stats.record_miss(MissReason::Stale);
        assert_eq!(stats.hit_rate(), 0.75);
    }

    #[test]
    fn test_failures_do_not_count_as_misses_by_themselves() {
        let mut stats = CacheStats::new();
        stats.record_persistence_failure();
        stats.record_eviction();

        assert_eq!(stats.persistence_failures, 1);
        assert_eq!(stats.evictions, 1);
        assert_eq!(stats.misses, 0);
    }

    #[test]
    fn test_snapshot_sets_entries_only() {
        let mut stats = CacheStats::new();
        stats.record_hit();

        let snapshot = stats.snapshot(7);
        assert_eq!(snapshot.entries, 7);
        assert_eq!(snapshot.hits, 1);
        assert_eq!(stats.entries, 0);
    }

    #[test]
    fn test_stats_serialize() {
        let mut stats = CacheStats::new();
        stats.record_miss(MissReason::Unreadable);

        let json = serde_json::to_value(stats.snapshot(3)).unwrap();
        assert_eq!(json["misses"], 1);
        assert_eq!(json["unreadable_misses"], 1);
        assert_eq!(json["entries"], 3);
        assert_eq!(serde_json::to_value(MissReason::Stale).unwrap(), "stale");
    }
}
