//! Error types for the memoizing cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache layer.
///
/// Only `Configuration` is ever returned to users of [`crate::Cache`];
/// the remaining variants describe persistence faults, which the controller
/// downgrades to cache misses.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Invalid construction parameters
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Backing file could not be read or written
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Entry or file document could not be encoded/decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Ciphertext rejected (wrong password or tampered data)
    #[error("Decryption failed: {0}")]
    Decryption(String),

    /// Stored blob is malformed
    #[error("Corrupted entry: {0}")]
    Corrupted(String),
}

impl CacheError {
    /// Returns true for faults of the persistence layer, which degrade to a miss.
    pub fn is_persistence(&self) -> bool {
        !matches!(self, CacheError::Configuration(_))
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache layer.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CacheError::Configuration("cache_size must be positive".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid configuration: cache_size must be positive"
        );

        let err = CacheError::Decryption("tag mismatch".to_string());
        assert_eq!(err.to_string(), "Decryption failed: tag mismatch");
    }

    #[test]
    fn test_persistence_classification() {
        assert!(!CacheError::Configuration("x".to_string()).is_persistence());
        assert!(CacheError::Corrupted("x".to_string()).is_persistence());
        assert!(CacheError::Decryption("x".to_string()).is_persistence());

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: CacheError = io.into();
        assert!(matches!(err, CacheError::Io(_)));
        assert!(err.is_persistence());
    }
}
