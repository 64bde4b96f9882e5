//! Integration Tests for Memoization
//!
//! Drives the public API end to end: expiry laws, eviction through the
//! controller, file persistence across reopen and encryption at rest.

use std::cell::Cell;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use memocache::{Algorithm, Cache, CacheConfig, CacheError, ManualClock, SystemClock};
use serde_json::Value;
use tempfile::TempDir;

// == Helper Functions ==

/// Decoded blobs of a backing file, in key order.
fn raw_blobs(path: &Path) -> Vec<Vec<u8>> {
    let document: Value = serde_json::from_slice(&fs::read(path).unwrap()).unwrap();
    document["entries"]
        .as_object()
        .unwrap()
        .values()
        .map(|blob| STANDARD.decode(blob.as_str().unwrap()).unwrap())
        .collect()
}

fn contains_bytes(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}

/// Calls a counting computation through `cache` and returns the value seen.
fn fetch(cache: &mut Cache<u32>, calls: &Cell<u32>) -> u32 {
    cache.get_or_insert_with("k", || {
        calls.set(calls.get() + 1);
        calls.get()
    })
}

// == Expiry Laws ==

#[test]
fn test_ttl_recomputes_after_expiry() {
    let clock = Arc::new(ManualClock::new());
    let config = CacheConfig::new().with_ttl(Duration::from_secs(1));
    let mut cache: Cache<u32> = Cache::with_clock(config, clock.clone()).unwrap();
    let calls = Cell::new(0);

    assert_eq!(fetch(&mut cache, &calls), 1);
    clock.advance(Duration::from_millis(1000));
    assert_eq!(fetch(&mut cache, &calls), 1, "age equal to ttl is still fresh");
    clock.advance(Duration::from_millis(1));
    assert_eq!(fetch(&mut cache, &calls), 2);
    assert_eq!(fetch(&mut cache, &calls), 2);
}

#[test]
fn test_noc_one_computation_per_n_calls() {
    let config = CacheConfig::new().with_noc(3);
    let mut cache: Cache<u32> = Cache::new(config).unwrap();
    let calls = Cell::new(0);

    let seen: Vec<u32> = (0..7).map(|_| fetch(&mut cache, &calls)).collect();

    assert_eq!(seen, vec![1, 1, 1, 2, 2, 2, 3]);
    let stats = cache.stats();
    assert_eq!(stats.misses, 3);
    assert_eq!(stats.hits, 4);
    assert_eq!(stats.stale_misses, 2);
    assert_eq!(stats.absent_misses(), 1);
}

#[test]
fn test_noc_and_ttl_scenario() {
    // noc=2, ttl=1s: computations at call 1, call 3 and after the clock passes the ttl
    let clock = Arc::new(ManualClock::new());
    let config = CacheConfig::new()
        .with_noc(2)
        .with_ttl(Duration::from_secs(1));
    let mut cache: Cache<u32> = Cache::with_clock(config, clock.clone()).unwrap();
    let calls = Cell::new(0);

    assert_eq!(fetch(&mut cache, &calls), 1);
    assert_eq!(fetch(&mut cache, &calls), 1);
    assert_eq!(fetch(&mut cache, &calls), 2);

    clock.advance(Duration::from_millis(1100));
    assert_eq!(fetch(&mut cache, &calls), 3);
}

#[test]
fn test_either_limit_expires_entry() {
    let clock = Arc::new(ManualClock::new());
    let config = CacheConfig::new()
        .with_noc(10)
        .with_ttl(Duration::from_secs(5));
    let mut cache: Cache<u32> = Cache::with_clock(config, clock.clone()).unwrap();
    let calls = Cell::new(0);

    // TTL runs out long before the call budget
    assert_eq!(fetch(&mut cache, &calls), 1);
    clock.advance(Duration::from_secs(6));
    assert_eq!(fetch(&mut cache, &calls), 2);

    // Call budget runs out while the clock stands still
    for _ in 0..9 {
        assert_eq!(fetch(&mut cache, &calls), 2);
    }
    assert_eq!(fetch(&mut cache, &calls), 3);
}

// == Eviction ==

#[test]
fn test_lfu_evicts_least_used() {
    let config = CacheConfig::new().with_cache_size(2);
    let mut cache: Cache<String> = Cache::new(config).unwrap();

    cache.insert("a", "A".to_string());
    cache.insert("b", "B".to_string());
    assert_eq!(cache.get("a"), Some("A".to_string()));
    cache.insert("c", "C".to_string());

    assert!(cache.contains("a"));
    assert!(!cache.contains("b"));
    assert!(cache.contains("c"));
    assert_eq!(cache.stats().evictions, 1);
}

#[test]
fn test_mfu_evicts_most_used() {
    let config = CacheConfig::new()
        .with_cache_size(2)
        .with_algorithm(Algorithm::Mfu);
    let mut cache: Cache<String> = Cache::new(config).unwrap();

    cache.insert("a", "A".to_string());
    cache.insert("b", "B".to_string());
    assert_eq!(cache.get("a"), Some("A".to_string()));
    cache.insert("c", "C".to_string());

    assert!(!cache.contains("a"));
    assert!(cache.contains("b"));
    assert!(cache.contains("c"));
}

#[test]
fn test_file_store_eviction_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let config = CacheConfig::new()
        .with_path(dir.path().join("lfu"))
        .with_cache_size(2);

    {
        let mut cache: Cache<u32> = Cache::new(config.clone()).unwrap();
        cache.insert("a", 1);
        cache.insert("b", 2);
        cache.get("b");
        cache.get("b");
        cache.get("a");
    }

    // Frequencies were persisted: a=2, b=3
    let mut cache: Cache<u32> = Cache::new(config).unwrap();
    cache.insert("c", 3);
    assert!(!cache.contains("a"));
    assert!(cache.contains("b"));
    assert_eq!(cache.len(), 2);
}

// == File Persistence ==

#[test]
fn test_memoized_results_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let config = CacheConfig::new().with_path(dir.path().join("memo"));

    let first: Cache<u64> = Cache::new(config.clone()).unwrap();
    let calls = Cell::new(0);
    let mut square = first.memoize("square", |x: &u64| {
        calls.set(calls.get() + 1);
        x * x
    });
    assert_eq!(square.call(4u64), 16);
    assert_eq!(calls.get(), 1);
    let backing = square.cache().backing_path().unwrap();
    drop(square);

    assert_eq!(backing, dir.path().join("memo.cache"));
    assert!(backing.exists());

    let second: Cache<u64> = Cache::new(config).unwrap();
    let mut square = second.memoize("square", |x: &u64| {
        calls.set(calls.get() + 1);
        x * x
    });
    assert_eq!(square.call(4u64), 16);
    assert_eq!(calls.get(), 1, "reopened cache must answer from disk");
}

#[test]
fn test_call_budget_is_persisted() {
    let dir = TempDir::new().unwrap();
    let config = CacheConfig::new()
        .with_path(dir.path().join("budget"))
        .with_noc(2);
    let calls = Cell::new(0);

    let mut cache: Cache<u32> = Cache::new(config.clone()).unwrap();
    assert_eq!(fetch(&mut cache, &calls), 1);
    drop(cache);

    let mut cache: Cache<u32> = Cache::new(config.clone()).unwrap();
    assert_eq!(fetch(&mut cache, &calls), 1);
    drop(cache);

    let mut cache: Cache<u32> = Cache::new(config).unwrap();
    assert_eq!(fetch(&mut cache, &calls), 2, "budget spent across processes");
}

#[test]
fn test_callable_error_propagates() {
    let dir = TempDir::new().unwrap();
    let config = CacheConfig::new().with_path(dir.path().join("errors"));
    let cache: Cache<u32> = Cache::new(config).unwrap();
    let mut parse = cache.memoize("parse", |s: &String| s.parse::<u32>());

    assert!(parse.try_call("nope".to_string()).is_err());
    assert!(parse.cache().is_empty());

    assert_eq!(parse.try_call("42".to_string()), Ok(42));
    assert_eq!(parse.cache().len(), 1);
    assert_eq!(parse.cache().stats().persistence_failures, 0);
}

// == Encryption ==

#[cfg(feature = "encryption")]
#[test]
fn test_encrypted_file_hides_values() {
    let dir = TempDir::new().unwrap();
    let config = CacheConfig::new()
        .with_path(dir.path().join("secret"))
        .with_password("hunter2");

    let mut cache: Cache<String> = Cache::new(config.clone()).unwrap();
    cache.insert("k", "plaintext-marker".to_string());
    let backing = cache.backing_path().unwrap();
    drop(cache);

    let blobs = raw_blobs(&backing);
    assert_eq!(blobs.len(), 1);
    assert!(!contains_bytes(&blobs[0], b"plaintext-marker"));

    let mut cache: Cache<String> = Cache::new(config).unwrap();
    assert_eq!(cache.get("k"), Some("plaintext-marker".to_string()));
}

#[cfg(feature = "encryption")]
#[test]
fn test_wrong_password_is_a_miss() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("secret");

    let mut cache: Cache<String> =
        Cache::new(CacheConfig::new().with_path(&path).with_password("right")).unwrap();
    cache.insert("k", "value".to_string());
    drop(cache);

    let mut cache: Cache<String> =
        Cache::new(CacheConfig::new().with_path(&path).with_password("wrong")).unwrap();
    let calls = Cell::new(0);
    let value = cache.get_or_insert_with("k", || {
        calls.set(calls.get() + 1);
        "recomputed".to_string()
    });

    assert_eq!(value, "recomputed");
    assert_eq!(calls.get(), 1);
    let stats = cache.stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.unreadable_misses, 1);
    assert_eq!(stats.persistence_failures, 1);
}

#[test]
fn test_password_without_cipher_stores_plaintext() {
    let dir = TempDir::new().unwrap();
    let config = CacheConfig::new()
        .with_path(dir.path().join("fallback"))
        .with_password("hunter2");

    let mut cache: Cache<String> = Cache::with_capabilities(config, SystemClock, None).unwrap();
    cache.insert("k", "plaintext-marker".to_string());
    assert_eq!(cache.get("k"), Some("plaintext-marker".to_string()));

    let blobs = raw_blobs(&cache.backing_path().unwrap());
    assert!(contains_bytes(&blobs[0], b"plaintext-marker"));
}

// == Configuration ==

#[test]
fn test_invalid_limits_are_rejected() {
    let zero_size: Result<Cache<u32>, _> = Cache::new(CacheConfig::new().with_cache_size(0));
    assert!(matches!(zero_size, Err(CacheError::Configuration(_))));

    let zero_noc: Result<Cache<u32>, _> = Cache::new(CacheConfig::new().with_noc(0));
    assert!(matches!(zero_noc, Err(CacheError::Configuration(_))));

    let zero_ttl: Result<Cache<u32>, _> = Cache::new(CacheConfig::new().with_ttl(Duration::ZERO));
    assert!(matches!(zero_ttl, Err(CacheError::Configuration(_))));
}
