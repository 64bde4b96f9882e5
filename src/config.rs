//! Configuration Module
//!
//! Construction parameters of a cache, loadable from environment variables.

use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CacheError, Result};

// == Algorithm ==
/// Eviction algorithm used when `cache_size` is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    /// Evict the least frequently used entry
    #[default]
    Lfu,
    /// Evict the most frequently used entry
    Mfu,
}

impl FromStr for Algorithm {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lfu" => Ok(Algorithm::Lfu),
            "mfu" => Ok(Algorithm::Mfu),
            other => Err(CacheError::Configuration(format!(
                "unknown eviction algorithm '{}', expected 'lfu' or 'mfu'",
                other
            ))),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Algorithm::Lfu => f.write_str("lfu"),
            Algorithm::Mfu => f.write_str("mfu"),
        }
    }
}

// == Cache Config ==
/// Cache construction parameters.
///
/// Absent `path` selects the memory store; present `path` selects the file
/// store. Every limit is optional and `None` disables it.
#[derive(Debug, Clone, Default)]
pub struct CacheConfig {
    /// Backing file path (the store appends its own extension)
    pub path: Option<PathBuf>,
    /// Time-to-live of each computed value
    pub ttl: Option<Duration>,
    /// Number of calls one computed value may answer
    pub noc: Option<u32>,
    /// Password enabling encryption at rest
    pub password: Option<String>,
    /// Maximum number of entries before eviction
    pub cache_size: Option<usize>,
    /// Victim selection when `cache_size` is reached
    pub algorithm: Algorithm,
}

impl CacheConfig {
    /// Creates an unlimited in-memory configuration.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_path(mut self, path: impl AsRef<Path>) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn with_noc(mut self, noc: u32) -> Self {
        self.noc = Some(noc);
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_cache_size(mut self, cache_size: usize) -> Self {
        self.cache_size = Some(cache_size);
        self
    }

    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Returns the password if one was given and it is non-empty.
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref().filter(|p| !p.is_empty())
    }

    // == Validate ==
    /// Rejects limits that would silently disable caching.
    ///
    /// Called by every cache constructor, so a bad configuration fails at
    /// construction and never at call time.
    pub fn validate(&self) -> Result<()> {
        if self.ttl.is_some_and(|ttl| ttl.is_zero()) {
            return Err(CacheError::Configuration(
                "ttl must be a positive duration".to_string(),
            ));
        }
        if self.noc == Some(0) {
            return Err(CacheError::Configuration(
                "noc must be a positive integer".to_string(),
            ));
        }
        if self.cache_size == Some(0) {
            return Err(CacheError::Configuration(
                "cache_size must be a positive integer".to_string(),
            ));
        }
        if self
            .path
            .as_ref()
            .is_some_and(|p| p.as_os_str().is_empty())
        {
            return Err(CacheError::Configuration(
                "path must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    // == From Env ==
    /// Creates a CacheConfig from environment variables.
    ///
    /// # Environment Variables
    /// - `MEMOCACHE_PATH` - Backing file path (default: memory store)
    /// - `MEMOCACHE_TTL` - TTL in seconds, fractional allowed (default: none)
    /// - `MEMOCACHE_NOC` - Calls per computed value (default: none)
    /// - `MEMOCACHE_KEY` - Encryption password (default: none)
    /// - `MEMOCACHE_CACHE_SIZE` - Capacity (default: unlimited)
    /// - `MEMOCACHE_ALGORITHM` - `lfu` or `mfu` (default: lfu)
    ///
    /// Unset variables keep their defaults, set but malformed ones are errors.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`CacheConfig::from_env`] with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = lookup("MEMOCACHE_PATH") {
            config.path = Some(PathBuf::from(path));
        }
        if let Some(ttl) = lookup("MEMOCACHE_TTL") {
            config.ttl = Some(parse_seconds(&ttl)?);
        }
        if let Some(noc) = lookup("MEMOCACHE_NOC") {
            config.noc = Some(parse_number("MEMOCACHE_NOC", &noc)?);
        }
        if let Some(key) = lookup("MEMOCACHE_KEY") {
            config.password = Some(key);
        }
        if let Some(size) = lookup("MEMOCACHE_CACHE_SIZE") {
            config.cache_size = Some(parse_number("MEMOCACHE_CACHE_SIZE", &size)?);
        }
        if let Some(algorithm) = lookup("MEMOCACHE_ALGORITHM") {
            config.algorithm = algorithm.parse()?;
        }

        config.validate()?;
        Ok(config)
    }
}

fn parse_seconds(raw: &str) -> Result<Duration> {
    let seconds: f64 = raw.trim().parse().map_err(|_| {
        CacheError::Configuration(format!("MEMOCACHE_TTL is not a number: '{}'", raw))
    })?;
    if !seconds.is_finite() || seconds <= 0.0 {
        return Err(CacheError::Configuration(format!(
            "MEMOCACHE_TTL must be positive, got {}",
            raw
        )));
    }
    Duration::try_from_secs_f64(seconds).map_err(|e| {
        CacheError::Configuration(format!("MEMOCACHE_TTL is out of range: '{}' ({})", raw, e))
    })
}

fn parse_number<T: FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim().parse().map_err(|_| {
        CacheError::Configuration(format!(
            "{} must be a positive integer, got '{}'",
            name, raw
        ))
    })
}
