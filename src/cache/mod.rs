//! Cache Module
//!
//! Entry lifecycle, expiry, frequency eviction, memory and file stores, and
//! the controller that memoizes calls on top of them.

mod blob_file;
mod controller;
mod entry;
mod eviction;
mod file;
mod memory;
mod stats;
mod store;


// Re-export public types
pub use blob_file::BlobFile;
pub use controller::{Cache, Memoized};
pub use entry::{CacheEntry, Expiry};
pub use eviction::{EntryMeta, EvictionPolicy};
pub use file::{backing_path, FileStore, FILE_EXTENSION};
pub use memory::MemoryStore;
pub use stats::{CacheStats, MissReason};
pub use store::Store;
