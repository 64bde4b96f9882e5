//! Memocache - memoization of deterministic functions
//!
//! Caches results keyed by call arguments, with TTL expiry, a per-value call
//! budget (NOC) and LFU/MFU eviction, in memory or in one optionally
//! encrypted file.

pub mod cache;
pub mod clock;
pub mod config;
pub mod crypto;
pub mod error;
pub mod key;

pub use cache::{Cache, CacheStats, Memoized, MissReason};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Algorithm, CacheConfig};
pub use crypto::Cipher;
pub use error::{CacheError, Result};
pub use key::cache_key;
