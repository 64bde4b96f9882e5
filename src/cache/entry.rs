//! Cache Entry Module
//!
//! Defines a stored result with its aging metadata, and the staleness rule.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::CacheConfig;

// == Expiry ==
/// Aging limits attached to an entry when it is written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Expiry {
    /// Maximum age of the value
    pub ttl: Option<Duration>,
    /// Calls one computed value may answer
    pub noc: Option<u32>,
}

impl Expiry {
    /// Entry never goes stale.
    pub const NEVER: Expiry = Expiry {
        ttl: None,
        noc: None,
    };

    pub fn from_config(config: &CacheConfig) -> Self {
        Self {
            ttl: config.ttl,
            noc: config.noc,
        }
    }
}

// == Cache Entry ==
/// Represents a single cached result with value and metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<V> {
    /// The cached result
    pub value: V,
    /// Time of the last write
    pub created_at: DateTime<Utc>,
    /// Time-to-live, None = never time-expires
    pub ttl: Option<Duration>,
    /// Call budget, None = never count-expires
    pub noc: Option<u32>,
    /// Reads charged against `noc` since the last write
    pub hits: u32,
    /// Access counter used for eviction ranking, never decremented
    pub frequency: u64,
    /// Insertion order, breaks eviction ties
    pub seq: u64,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates an entry for a newly inserted key.
    ///
    /// `frequency` starts at zero; the write that follows counts as an access.
    ///
    /// # Arguments
    /// * `value` - The computed result
    /// * `expiry` - TTL and NOC limits
    /// * `now` - Write time
    /// * `seq` - Store-wide insertion sequence number
    pub fn new(value: V, expiry: Expiry, now: DateTime<Utc>, seq: u64) -> Self {
        Self {
            value,
            created_at: now,
            ttl: expiry.ttl,
            noc: expiry.noc,
            hits: 0,
            frequency: 0,
            seq,
        }
    }

    // == Rewrite ==
    /// Replaces the value of an existing entry and restarts its aging.
    ///
    /// `frequency` and `seq` are kept.
    pub fn rewrite(&mut self, value: V, expiry: Expiry, now: DateTime<Utc>) {
        self.value = value;
        self.created_at = now;
        self.ttl = expiry.ttl;
        self.noc = expiry.noc;
        self.hits = 0;
    }

    // == Charge Read ==
    /// Counts one read against the call budget.
    pub fn charge_read(&mut self) {
        self.hits = self.hits.saturating_add(1);
    }

    // == Is Stale ==
    /// Checks whether the entry must be recomputed.
    ///
    /// Stale when the TTL has strictly elapsed or the call budget is spent;
    /// either condition alone is enough.
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        self.ttl_elapsed(now) || self.noc_exhausted()
    }

    fn ttl_elapsed(&self, now: DateTime<Utc>) -> bool {
        match self.ttl {
            // A clock that moved backwards yields Err, which counts as fresh
            Some(ttl) => (now - self.created_at)
                .to_std()
                .is_ok_and(|age| age > ttl),
            None => false,
        }
    }

    fn noc_exhausted(&self) -> bool {
        self.noc.is_some_and(|noc| self.hits >= noc)
    }

    // == Time To Live ==
    /// Returns remaining lifetime, or None if no TTL is set.
    ///
    /// # Returns
    /// - `Some(Duration::ZERO)` if the TTL has elapsed
    /// - `Some(remaining)` otherwise
    pub fn ttl_remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.ttl.map(|ttl| {
            let age = (now - self.created_at).to_std().unwrap_or(Duration::ZERO);
            ttl.saturating_sub(age)
        })
    }
}
