//! Key Module
//!
//! Lookup keys for memoized calls.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::Result;

// == Cache Key ==
/// Derives the cache key of a call from the callable's name and its arguments.
///
/// The arguments are hashed through their JSON encoding, so the key is stable
/// across processes and a file-backed cache finds its entries after a restart.
pub fn cache_key<A: Serialize + ?Sized>(name: &str, args: &A) -> Result<String> {
    let encoded = serde_json::to_vec(args)?;
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    hasher.update([0u8]);
    hasher.update(&encoded);
    Ok(hex::encode(hasher.finalize()))
}
