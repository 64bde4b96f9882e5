//! Memory Store Module
//!
//! In-process store: HashMap storage with lazy expiry and frequency eviction.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::cache::store::check_capacity;
use crate::cache::{CacheEntry, EntryMeta, EvictionPolicy, Expiry, Store};
use crate::config::Algorithm;
use crate::error::Result;

// == Memory Store ==
/// Entries held in process memory, lost when the store is dropped.
#[derive(Debug)]
pub struct MemoryStore<V> {
    /// Key-entry storage
    entries: HashMap<String, CacheEntry<V>>,
    /// Victim selection and frequency ranking
    policy: EvictionPolicy,
    /// Maximum number of entries, None = unlimited
    capacity: Option<usize>,
    /// Insertion counter for eviction tie-breaks
    next_seq: u64,
}

impl<V> MemoryStore<V> {
    // == Constructor ==
    /// Creates an empty store.
    ///
    /// # Arguments
    /// * `capacity` - Maximum number of entries, None = unlimited
    /// * `algorithm` - Victim selection when full
    ///
    /// # Errors
    /// `Configuration` if `capacity` is zero.
    pub fn new(capacity: Option<usize>, algorithm: Algorithm) -> Result<Self> {
        check_capacity(capacity)?;
        Ok(Self {
            entries: HashMap::new(),
            policy: EvictionPolicy::new(algorithm),
            capacity,
            next_seq: 0,
        })
    }

    /// Unlimited store, never evicts.
    pub fn unbounded() -> Self {
        Self {
            entries: HashMap::new(),
            policy: EvictionPolicy::default(),
            capacity: None,
            next_seq: 0,
        }
    }

    /// Read-only view of an entry, including stale ones.
    pub fn entry(&self, key: &str) -> Option<&CacheEntry<V>> {
        self.entries.get(key)
    }

    // == Make Room ==
    /// Evicts one entry if inserting a new key would exceed capacity.
    fn make_room(&mut self) -> Option<String> {
        let capacity = self.capacity?;
        if self.entries.len() < capacity {
            return None;
        }

        let victim = self
            .policy
            .select_victim(
                self.entries
                    .iter()
                    .map(|(key, entry)| (key.as_str(), Some(EntryMeta::from(entry)))),
            )
            .map(str::to_string)?;

        self.entries.remove(&victim);
        Some(victim)
    }
}

impl<V: Clone> Store<V> for MemoryStore<V> {
    fn get(&mut self, key: &str, now: DateTime<Utc>) -> Result<Option<V>> {
        let Some(entry) = self.entries.get_mut(key) else {
            return Ok(None);
        };

        entry.charge_read();
        if entry.is_stale(now) {
            // Lazy deletion; the recomputed value becomes a new entry
            self.entries.remove(key);
            return Ok(None);
        }

        self.policy.on_access(entry);
        Ok(Some(entry.value.clone()))
    }

    fn put(
        &mut self,
        key: &str,
        value: V,
        expiry: Expiry,
        now: DateTime<Utc>,
    ) -> Result<Option<String>> {
        if let Some(entry) = self.entries.get_mut(key) {
            entry.rewrite(value, expiry, now);
            self.policy.on_access(entry);
            return Ok(None);
        }

        let evicted = self.make_room();

        let mut entry = CacheEntry::new(value, expiry, now, self.next_seq);
        self.next_seq += 1;
        self.policy.on_insert(&mut entry);
        self.policy.on_access(&mut entry);
        self.entries.insert(key.to_string(), entry);

        Ok(evicted)
    }

    fn remove(&mut self, key: &str) -> Result<bool> {
        Ok(self.entries.remove(key).is_some())
    }

    fn clear(&mut self) -> Result<()> {
        self.entries.clear();
        Ok(())
    }

    fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn capacity(&self) -> Option<usize> {
        self.capacity
    }
}
