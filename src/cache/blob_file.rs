//! Blob File Module
//!
//! Durable string-to-bytes mapping backing the file store.
//!
//! The whole mapping lives in one JSON document. It is read once on open and
//! rewritten atomically (temp file + rename) on every flush, so no handle to
//! the backing file is held between operations.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::{CacheError, Result};

/// Layout version written to every document.
const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct Document {
    version: u32,
    next_seq: u64,
    entries: BTreeMap<String, String>,
}

// == Blob File ==
/// In-memory image of the backing file.
#[derive(Debug)]
pub struct BlobFile {
    path: PathBuf,
    entries: BTreeMap<String, Vec<u8>>,
    next_seq: u64,
}

impl BlobFile {
    // == Open ==
    /// Loads the mapping stored at `path`.
    ///
    /// A missing file yields an empty mapping. A file that is not a valid
    /// document is logged and treated as empty; it is replaced on the next
    /// flush.
    ///
    /// # Errors
    /// `Io` when the file exists but cannot be read.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut file = Self {
            path,
            entries: BTreeMap::new(),
            next_seq: 0,
        };

        let bytes = match fs::read(&file.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %file.path.display(), "no backing file yet, starting empty");
                return Ok(file);
            }
            Err(err) => return Err(err.into()),
        };

        match Self::parse(&bytes) {
            Ok((entries, next_seq)) => {
                file.entries = entries;
                file.next_seq = next_seq;
            }
            Err(err) => {
                warn!(
                    path = %file.path.display(),
                    error = %err,
                    "backing file is unreadable, starting empty"
                );
            }
        }

        Ok(file)
    }

    fn parse(bytes: &[u8]) -> Result<(BTreeMap<String, Vec<u8>>, u64)> {
        let document: Document = serde_json::from_slice(bytes)?;
        if document.version != FORMAT_VERSION {
            return Err(CacheError::Corrupted(format!(
                "unsupported file version {}",
                document.version
            )));
        }

        let mut entries = BTreeMap::new();
        for (key, encoded) in document.entries {
            let blob = STANDARD
                .decode(encoded.as_bytes())
                .map_err(|e| CacheError::Corrupted(format!("blob '{}': {}", key, e)))?;
            entries.insert(key, blob);
        }

        Ok((entries, document.next_seq))
    }

    // == Flush ==
    /// Writes the mapping to disk, replacing the previous file atomically.
    ///
    /// The temp file is removed on every error path.
    pub fn flush(&self) -> Result<()> {
        let document = Document {
            version: FORMAT_VERSION,
            next_seq: self.next_seq,
            entries: self
                .entries
                .iter()
                .map(|(key, blob)| (key.clone(), STANDARD.encode(blob)))
                .collect(),
        };

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut tmp = NamedTempFile::new_in(dir)?;
        serde_json::to_writer(&mut tmp, &document)?;
        tmp.flush()?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| CacheError::Io(e.error))?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    pub fn insert(&mut self, key: &str, blob: Vec<u8>) {
        self.entries.insert(key.to_string(), blob);
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates blobs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.entries
            .iter()
            .map(|(key, blob)| (key.as_str(), blob.as_slice()))
    }

    /// Hands out the next insertion sequence number; persisted on flush.
    pub fn allocate_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }
}
