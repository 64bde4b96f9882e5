//! Cache Controller Module
//!
//! Binds a store, a clock and the configured limits to the callables whose
//! results are cached.

use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::{
    backing_path, CacheStats, Expiry, FileStore, MemoryStore, MissReason, Store,
};
use crate::clock::{Clock, SystemClock};
use crate::config::CacheConfig;
use crate::crypto::{self, Cipher};
use crate::error::{CacheError, Result};
use crate::key::cache_key;

// == Cache ==
/// Memoizing cache for values of type `V`.
///
/// Only the wrapped callable's own errors ever reach the caller. Store faults
/// are logged, counted in [`CacheStats::persistence_failures`] and handled
/// as misses.
///
/// Not synchronized: `Cache` is `Send`, so share one instance across threads
/// behind an external lock such as `Arc<Mutex<Cache<V>>>`.
pub struct Cache<V> {
    store: Box<dyn Store<V> + Send>,
    clock: Box<dyn Clock>,
    config: CacheConfig,
    expiry: Expiry,
    stats: CacheStats,
}

impl<V> Cache<V>
where
    V: Clone + Serialize + DeserializeOwned + Send + 'static,
{
    // == Constructors ==
    /// Creates a cache reading the wall clock and using the built-in cipher.
    ///
    /// # Errors
    /// `Configuration` for invalid parameters, `Io` if an existing backing
    /// file cannot be read.
    pub fn new(config: CacheConfig) -> Result<Self> {
        Self::with_clock(config, SystemClock)
    }

    /// Creates a cache driven by a custom clock.
    pub fn with_clock(config: CacheConfig, clock: impl Clock + 'static) -> Result<Self> {
        Self::with_capabilities(config, clock, crypto::default_cipher())
    }

    /// Creates a cache with every capability injected.
    ///
    /// # Arguments
    /// * `config` - Validated before anything is opened
    /// * `clock` - Time source for TTL
    /// * `cipher` - Encryption capability, None to store plaintext
    pub fn with_capabilities(
        config: CacheConfig,
        clock: impl Clock + 'static,
        cipher: Option<Box<dyn Cipher>>,
    ) -> Result<Self> {
        config.validate()?;

        let store: Box<dyn Store<V> + Send> = match &config.path {
            Some(path) => Box::new(FileStore::open(
                path,
                config.cache_size,
                config.algorithm,
                config.password(),
                cipher,
            )?),
            None => {
                if config.password().is_some() {
                    debug!("memory store keeps values unencrypted, password ignored");
                }
                Box::new(MemoryStore::new(config.cache_size, config.algorithm)?)
            }
        };

        info!(
            backend = if config.path.is_some() { "file" } else { "memory" },
            ttl_ms = config.ttl.map(|ttl| ttl.as_millis() as u64),
            noc = config.noc,
            cache_size = config.cache_size,
            algorithm = %config.algorithm,
            "cache created"
        );

        Ok(Self {
            store,
            clock: Box::new(clock),
            expiry: Expiry::from_config(&config),
            config,
            stats: CacheStats::new(),
        })
    }

    // == Get Or Insert ==
    /// Returns the cached value for `key`, computing and storing it on a miss.
    pub fn get_or_insert_with<F>(&mut self, key: &str, compute: F) -> V
    where
        F: FnOnce() -> V,
    {
        if let Some(value) = self.get(key) {
            return value;
        }
        let value = compute();
        self.insert(key, value.clone());
        value
    }

    /// Fallible version of [`Cache::get_or_insert_with`].
    ///
    /// An error from `compute` is returned unchanged and nothing is written.
    pub fn try_get_or_insert_with<F, E>(
        &mut self,
        key: &str,
        compute: F,
    ) -> std::result::Result<V, E>
    where
        F: FnOnce() -> std::result::Result<V, E>,
    {
        if let Some(value) = self.get(key) {
            return Ok(value);
        }
        let value = compute()?;
        self.insert(key, value.clone());
        Ok(value)
    }

    // == Get ==
    /// Looks up a fresh value, counting the read against its limits.
    pub fn get(&mut self, key: &str) -> Option<V> {
        let now = self.clock.now();
        let present = self.store.contains(key);
        match self.store.get(key, now) {
            Ok(Some(value)) => {
                self.stats.record_hit();
                debug!(key, "cache hit");
                Some(value)
            }
            Ok(None) => {
                // A present entry that reads as None was stale and is gone now
                let reason = if present {
                    MissReason::Stale
                } else {
                    MissReason::Absent
                };
                self.stats.record_miss(reason);
                debug!(key, ?reason, "cache miss");
                None
            }
            Err(err) => {
                self.degrade(key, &err);
                self.stats.record_miss(MissReason::Unreadable);
                None
            }
        }
    }

    // == Insert ==
    /// Stores a value, restarting its TTL and call budget.
    pub fn insert(&mut self, key: &str, value: V) {
        let now = self.clock.now();
        match self.store.put(key, value, self.expiry, now) {
            Ok(Some(evicted)) => {
                self.stats.record_eviction();
                debug!(key, evicted = %evicted, "evicted entry to make room");
            }
            Ok(None) => {}
            Err(err) => self.degrade(key, &err),
        }
    }

    // == Invalidate ==
    /// Drops the entry for `key`, returning whether one existed.
    pub fn invalidate(&mut self, key: &str) -> bool {
        match self.store.remove(key) {
            Ok(removed) => removed,
            Err(err) => {
                self.degrade(key, &err);
                false
            }
        }
    }

    // == Clear ==
    /// Drops every entry.
    pub fn clear(&mut self) {
        match self.store.clear() {
            Ok(()) => info!("cache cleared"),
            Err(err) => {
                self.stats.record_persistence_failure();
                warn!(error = %err, "failed to clear cache");
            }
        }
    }

    // == Memoize ==
    /// Binds this cache to a callable.
    ///
    /// `name` identifies the callable in keys, so two memoized functions may
    /// share one backing file.
    pub fn memoize<F>(self, name: impl Into<String>, func: F) -> Memoized<V, F> {
        Memoized {
            cache: self,
            name: name.into(),
            func,
        }
    }

    fn degrade(&mut self, key: &str, err: &CacheError) {
        self.stats.record_persistence_failure();
        warn!(key, error = %err, "cache store failure, treating as miss");
    }
}

impl<V> Cache<V> {
    /// True if an entry exists for `key`, fresh or not.
    pub fn contains(&self, key: &str) -> bool {
        self.store.contains(key)
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Path of the backing file, None for a memory cache.
    pub fn backing_path(&self) -> Option<PathBuf> {
        self.config.path.as_deref().map(backing_path)
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot(self.store.len())
    }
}

// == Memoized ==
/// A callable bound to its own cache.
///
/// Calls are keyed by the callable's name and the JSON encoding of the
/// arguments.
pub struct Memoized<V, F> {
    cache: Cache<V>,
    name: String,
    func: F,
}

impl<V, F> Memoized<V, F>
where
    V: Clone + Serialize + DeserializeOwned + Send + 'static,
{
    /// Returns the cached result for `args` or invokes the callable.
    pub fn call<A>(&mut self, args: A) -> V
    where
        A: Serialize,
        F: FnMut(&A) -> V,
    {
        let func = &mut self.func;
        match cache_key(&self.name, &args) {
            Ok(key) => self.cache.get_or_insert_with(&key, || func(&args)),
            Err(err) => {
                warn!(name = %self.name, error = %err, "arguments not hashable, calling uncached");
                func(&args)
            }
        }
    }

    /// Returns the cached result for `args` or invokes the fallible callable.
    ///
    /// The callable's error is returned as is and leaves the cache untouched.
    pub fn try_call<A, E>(&mut self, args: A) -> std::result::Result<V, E>
    where
        A: Serialize,
        F: FnMut(&A) -> std::result::Result<V, E>,
    {
        let func = &mut self.func;
        match cache_key(&self.name, &args) {
            Ok(key) => self.cache.try_get_or_insert_with(&key, || func(&args)),
            Err(err) => {
                warn!(name = %self.name, error = %err, "arguments not hashable, calling uncached");
                func(&args)
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<V, F> Memoized<V, F> {
    pub fn cache(&self) -> &Cache<V> {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut Cache<V> {
        &mut self.cache
    }

    /// Unbinds the callable, returning the cache.
    pub fn into_cache(self) -> Cache<V> {
        self.cache
    }
}
