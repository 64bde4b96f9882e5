//! File Store Module
//!
//! Persistent store: every entry is serialized (and optionally encrypted)
//! into one blob of a single backing file.

use std::ffi::OsString;
use std::fmt;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{info, warn};

use crate::cache::store::check_capacity;
use crate::cache::{BlobFile, CacheEntry, EntryMeta, EvictionPolicy, Expiry, Store};
use crate::config::Algorithm;
use crate::crypto::Cipher;
use crate::error::Result;

/// Extension appended to the configured path.
pub const FILE_EXTENSION: &str = "cache";

/// Path of the file backing a cache configured with `base_path`.
pub fn backing_path(base_path: &Path) -> PathBuf {
    let mut name = OsString::from(base_path.as_os_str());
    name.push(".");
    name.push(FILE_EXTENSION);
    PathBuf::from(name)
}

// == File Store ==
/// Entries persisted in one file, surviving process restarts.
pub struct FileStore<V> {
    /// Durable key-blob mapping
    file: BlobFile,
    /// Victim selection and frequency ranking
    policy: EvictionPolicy,
    /// Maximum number of entries, None = unlimited
    capacity: Option<usize>,
    /// Cipher and password, present only when encryption is active
    sealing: Option<(Box<dyn Cipher>, String)>,
    _value: PhantomData<fn() -> V>,
}

impl<V> fmt::Debug for FileStore<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileStore")
            .field("path", &self.file.path())
            .field("entries", &self.file.len())
            .field("capacity", &self.capacity)
            .field("algorithm", &self.policy.algorithm())
            .field("encrypted", &self.sealing.is_some())
            .finish()
    }
}

impl<V> FileStore<V>
where
    V: Serialize + DeserializeOwned,
{
    // == Open ==
    /// Opens (or prepares to create) the store backing `base_path`.
    ///
    /// The file actually used is `base_path` with `.cache` appended.
    ///
    /// # Arguments
    /// * `base_path` - Configured cache path
    /// * `capacity` - Maximum number of entries, None = unlimited
    /// * `algorithm` - Victim selection when full
    /// * `password` - Enables encryption when a cipher is available
    /// * `cipher` - Encryption capability, None when unavailable
    ///
    /// A password without a cipher stores plaintext and logs one warning.
    pub fn open(
        base_path: &Path,
        capacity: Option<usize>,
        algorithm: Algorithm,
        password: Option<&str>,
        cipher: Option<Box<dyn Cipher>>,
    ) -> Result<Self> {
        check_capacity(capacity)?;

        let sealing = match (password.filter(|p| !p.is_empty()), cipher) {
            (Some(password), Some(cipher)) => Some((cipher, password.to_string())),
            (Some(_), None) => {
                warn!("encryption requested but no cipher is available; cached data will not be encrypted");
                None
            }
            (None, _) => None,
        };

        let file = BlobFile::open(backing_path(base_path))?;
        info!(
            path = %file.path().display(),
            entries = file.len(),
            encrypted = sealing.is_some(),
            "file store opened"
        );

        Ok(Self {
            file,
            policy: EvictionPolicy::new(algorithm),
            capacity,
            sealing,
            _value: PhantomData,
        })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn is_encrypted(&self) -> bool {
        self.sealing.is_some()
    }

    // == Encode / Decode ==
    fn encode(&self, entry: &CacheEntry<V>) -> Result<Vec<u8>> {
        let plain = serde_json::to_vec(entry)?;
        match &self.sealing {
            Some((cipher, password)) => cipher.encrypt(&plain, password),
            None => Ok(plain),
        }
    }

    /// Decodes a blob into a full entry or just its [`EntryMeta`].
    fn decode<T: DeserializeOwned>(&self, blob: &[u8]) -> Result<T> {
        match &self.sealing {
            Some((cipher, password)) => {
                let plain = cipher.decrypt(blob, password)?;
                Ok(serde_json::from_slice(&plain)?)
            }
            None => Ok(serde_json::from_slice(blob)?),
        }
    }

    fn write(&mut self, key: &str, entry: &CacheEntry<V>) -> Result<()> {
        let blob = self.encode(entry)?;
        self.file.insert(key, blob);
        self.file.flush()
    }

    // == Make Room ==
    /// Evicts one entry if inserting a new key would exceed capacity.
    ///
    /// Ranks on metadata headers only; a blob that does not decode with the
    /// current password is the first victim.
    fn make_room(&mut self) -> Option<String> {
        let capacity = self.capacity?;
        if self.file.len() < capacity {
            return None;
        }

        let victim = self
            .policy
            .select_victim(self.file.iter().map(|(key, blob)| {
                (key.to_string(), self.decode::<EntryMeta>(blob).ok())
            }))?;

        self.file.remove(&victim);
        Some(victim)
    }
}

impl<V> Store<V> for FileStore<V>
where
    V: Serialize + DeserializeOwned,
{
    fn get(&mut self, key: &str, now: DateTime<Utc>) -> Result<Option<V>> {
        let mut entry: CacheEntry<V> = match self.file.get(key) {
            Some(blob) => self.decode(blob)?,
            None => return Ok(None),
        };

        entry.charge_read();
        if entry.is_stale(now) {
            self.file.remove(key);
            self.file.flush()?;
            return Ok(None);
        }

        self.policy.on_access(&mut entry);
        self.write(key, &entry)?;
        Ok(Some(entry.value))
    }

    fn put(
        &mut self,
        key: &str,
        value: V,
        expiry: Expiry,
        now: DateTime<Utc>,
    ) -> Result<Option<String>> {
        // Some(rank) for an existing key; the rank is None if its blob is unreadable
        let existing = self
            .file
            .get(key)
            .map(|blob| self.decode::<EntryMeta>(blob).ok());

        let mut entry = match existing {
            Some(Some(meta)) => {
                let mut entry = CacheEntry::new(value, expiry, now, meta.seq);
                entry.frequency = meta.frequency;
                entry
            }
            Some(None) => CacheEntry::new(value, expiry, now, self.file.allocate_seq()),
            None => {
                let mut entry = CacheEntry::new(value, expiry, now, self.file.allocate_seq());
                self.policy.on_insert(&mut entry);
                entry
            }
        };
        self.policy.on_access(&mut entry);

        // Evict only once the new blob is known to encode
        let blob = self.encode(&entry)?;
        let evicted = match existing {
            None => self.make_room(),
            Some(_) => None,
        };

        self.file.insert(key, blob);
        self.file.flush()?;
        Ok(evicted)
    }

    fn remove(&mut self, key: &str) -> Result<bool> {
        if !self.file.remove(key) {
            return Ok(false);
        }
        self.file.flush()?;
        Ok(true)
    }

    fn clear(&mut self) -> Result<()> {
        self.file.clear();
        self.file.flush()
    }

    fn contains(&self, key: &str) -> bool {
        self.file.contains_key(key)
    }

    fn len(&self) -> usize {
        self.file.len()
    }

    fn capacity(&self) -> Option<usize> {
        self.capacity
    }
}
