//! Cache Store Module
//!
//! Contract shared by the memory and file stores.

use chrono::{DateTime, Utc};

use crate::cache::Expiry;
use crate::error::Result;

// == Store ==
/// Owns every entry of one cache and applies expiry and eviction.
///
/// Stores never read the clock themselves; the caller passes `now` so one
/// logical operation sees one instant.
pub trait Store<V> {
    /// Looks up a fresh value.
    ///
    /// A present entry is charged one read against its call budget. If it is
    /// then stale it is removed and the lookup reports a miss; otherwise its
    /// frequency is bumped and the value returned.
    ///
    /// # Errors
    /// Persistence faults (I/O, decode, decryption) for this key.
    fn get(&mut self, key: &str, now: DateTime<Utc>) -> Result<Option<V>>;

    /// Writes a value and restarts its aging.
    ///
    /// Inserting a new key into a full store evicts one entry first; the
    /// evicted key is returned. Overwriting an existing key never evicts.
    fn put(&mut self, key: &str, value: V, expiry: Expiry, now: DateTime<Utc>)
        -> Result<Option<String>>;

    /// Removes an entry, returning whether it existed.
    fn remove(&mut self, key: &str) -> Result<bool>;

    /// Removes every entry.
    fn clear(&mut self) -> Result<()>;

    /// Checks presence without judging staleness or touching counters.
    fn contains(&self, key: &str) -> bool;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of entries, None = unlimited.
    fn capacity(&self) -> Option<usize>;
}

/// Rejects a zero capacity; shared by both store constructors.
pub(crate) fn check_capacity(capacity: Option<usize>) -> Result<()> {
    if capacity == Some(0) {
        return Err(crate::error::CacheError::Configuration(
            "cache_size must be a positive integer".to_string(),
        ));
    }
    Ok(())
}
