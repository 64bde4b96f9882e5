//! Eviction Policy Module
//!
//! Frequency ranking and victim selection for capacity-bounded stores.

use std::cmp::Ordering;

use serde::Deserialize;

use crate::cache::CacheEntry;
use crate::config::Algorithm;

// == Entry Meta ==
/// The part of an entry that eviction ranks on.
///
/// Deserializes from a full serialized [`CacheEntry`] without decoding the
/// value, which lets the file store rank blobs cheaply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct EntryMeta {
    pub frequency: u64,
    pub seq: u64,
}

impl<V> From<&CacheEntry<V>> for EntryMeta {
    fn from(entry: &CacheEntry<V>) -> Self {
        Self {
            frequency: entry.frequency,
            seq: entry.seq,
        }
    }
}

// == Eviction Policy ==
/// Chooses which entry leaves a full store.
///
/// - `Lfu`: lowest frequency goes first
/// - `Mfu`: highest frequency goes first
///
/// Ties go to the oldest inserted entry (smallest `seq`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvictionPolicy {
    algorithm: Algorithm,
}

impl EvictionPolicy {
    pub fn new(algorithm: Algorithm) -> Self {
        Self { algorithm }
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    // == On Insert ==
    /// Initializes ranking state of a new entry.
    pub fn on_insert<V>(&self, entry: &mut CacheEntry<V>) {
        entry.frequency = 0;
    }

    // == On Access ==
    /// Bumps the frequency on every successful read and every write.
    pub fn on_access<V>(&self, entry: &mut CacheEntry<V>) {
        entry.frequency = entry.frequency.saturating_add(1);
    }

    // == Select Victim ==
    /// Returns the key to evict, or None if there are no candidates.
    ///
    /// A candidate without metadata (an entry the store could not decode)
    /// is evicted before any readable entry.
    pub fn select_victim<K, I>(&self, candidates: I) -> Option<K>
    where
        I: IntoIterator<Item = (K, Option<EntryMeta>)>,
    {
        let mut victim: Option<(K, Option<EntryMeta>)> = None;

        for (key, meta) in candidates {
            let replace = match &victim {
                None => true,
                Some((_, current)) => self.outranks(meta, *current),
            };
            if replace {
                victim = Some((key, meta));
            }
        }

        victim.map(|(key, _)| key)
    }

    fn outranks(&self, candidate: Option<EntryMeta>, current: Option<EntryMeta>) -> bool {
        match (candidate, current) {
            (None, Some(_)) => true,
            (None, None) | (Some(_), None) => false,
            (Some(c), Some(v)) => {
                let by_frequency = match self.algorithm {
                    Algorithm::Lfu => c.frequency.cmp(&v.frequency),
                    Algorithm::Mfu => v.frequency.cmp(&c.frequency),
                };
                by_frequency.then(c.seq.cmp(&v.seq)) == Ordering::Less
            }
        }
    }
}
