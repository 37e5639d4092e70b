//! Persisted symbol-to-file cache.
//!
//! The cache is a flat map from symbol name to the file that defined it. It
//! is always written whole: a temporary file is written next to the target
//! and renamed over it, so readers never observe a partial write. Keys are
//! kept in a `BTreeMap` so the output is sorted and reproducible.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Symbol name to the file that satisfied it.
pub type CacheEntries = BTreeMap<String, PathBuf>;

/// Directory for pathloader state within a project root.
pub const STATE_DIR: &str = ".pathloader";

/// Default cache file name within [`STATE_DIR`].
pub const DEFAULT_CACHE_NAME: &str = "cache.json";

/// The current schema version for cache files.
/// Increment this when making breaking changes to the format.
pub const CACHE_VERSION: u32 = 1;

/// Errors that can occur while reading or writing a cache
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to access cache file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to (de)serialize cache: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to replace cache file: {0}")]
    Persist(#[from] tempfile::PersistError),

    #[error("Unsupported cache version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
}

/// Where a [`crate::CachedResolver`] keeps its entries between processes.
pub trait CacheStore {
    /// Read every entry. A store that has never been written is empty.
    fn load(&self) -> Result<CacheEntries, StoreError>;

    /// Replace the stored entries with `entries`.
    fn save(&mut self, entries: &CacheEntries) -> Result<(), StoreError>;
}

/// Get the default cache file path for a project root.
pub fn cache_file_path(root: &Path) -> PathBuf {
    root.join(STATE_DIR).join(DEFAULT_CACHE_NAME)
}

#[derive(Deserialize)]
struct CacheFile {
    version: u32,
    #[serde(default)]
    entries: CacheEntries,
}

#[derive(Serialize)]
struct CacheFileRef<'a> {
    version: u32,
    entries: &'a CacheEntries,
}

/// Cache persisted as a JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the cache file. Returns false if there was nothing to delete.
    pub fn clear(&self) -> Result<bool, StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Parse cache entries from a JSON string
    pub fn from_json(json: &str) -> Result<CacheEntries, StoreError> {
        let file: CacheFile = serde_json::from_str(json)?;
        if file.version != CACHE_VERSION {
            return Err(StoreError::UnsupportedVersion {
                found: file.version,
                expected: CACHE_VERSION,
            });
        }
        Ok(file.entries)
    }
}

impl CacheStore for JsonFileStore {
    fn load(&self) -> Result<CacheEntries, StoreError> {
        if !self.path.exists() {
            return Ok(CacheEntries::new());
        }
        let content = fs::read_to_string(&self.path)?;
        Self::from_json(&content)
    }

    fn save(&mut self, entries: &CacheEntries) -> Result<(), StoreError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let mut temp = tempfile::NamedTempFile::new_in(&dir)?;
        let document = CacheFileRef {
            version: CACHE_VERSION,
            entries,
        };
        serde_json::to_writer_pretty(&mut temp, &document)?;
        writeln!(temp)?;
        temp.as_file().sync_all()?;
        temp.persist(&self.path)?;

        tracing::debug!("Wrote {} cache entries to {:?}", entries.len(), self.path);
        Ok(())
    }
}

/// Cache kept in memory, counting how often it was written.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: CacheEntries,
    saves: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: CacheEntries) -> Self {
        Self { entries, saves: 0 }
    }

    pub fn entries(&self) -> &CacheEntries {
        &self.entries
    }

    /// Number of times [`CacheStore::save`] was called.
    pub fn saves(&self) -> usize {
        self.saves
    }
}

impl CacheStore for MemoryStore {
    fn load(&self) -> Result<CacheEntries, StoreError> {
        Ok(self.entries.clone())
    }

    fn save(&mut self, entries: &CacheEntries) -> Result<(), StoreError> {
        self.entries = entries.clone();
        self.saves += 1;
        Ok(())
    }
}
