//! Storage backends for cache entries
//!
//! Entries are stored as JSON values together with the time they were written
//! and the time they stop being fresh. The in-memory store keeps them in a
//! mutex-guarded map; the file store persists one JSON file per key in an
//! XDG-compliant cache directory (`~/.cache/clima-proxy/` on Linux).

use std::collections::HashMap;
use std::fmt::Debug;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Duration, Utc};
use directories::ProjectDirs;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::CacheKey;

/// Errors raised by a cache store
#[derive(Debug, Error)]
pub enum CacheError {
    /// Reading or writing the backing storage failed
    #[error("Cache I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// A value could not be converted to or from JSON
    #[error("Cache serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A stored value with its freshness window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The cached value
    pub value: serde_json::Value,
    /// When the value was stored
    pub cached_at: DateTime<Utc>,
    /// When the value stops being fresh
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Creates an entry stored at `now` that stays fresh for `ttl`
    pub fn new(value: serde_json::Value, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            value,
            cached_at: now,
            expires_at: now + ttl,
        }
    }

    /// An entry is fresh while `now < cached_at + ttl`
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Key-to-entry storage shared by all requests
///
/// Implementations must make each `read`/`write` atomic with respect to the
/// others: a reader sees either the old entry or the new one.
pub trait CacheStore: Send + Sync + Debug {
    /// Returns a copy of the entry stored under `key`, if any
    fn read(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CacheError>;

    /// Stores `entry` under `key`, replacing any previous entry
    fn write(&self, key: &CacheKey, entry: CacheEntry) -> Result<(), CacheError>;
}

/// Process-local store backed by a map behind a mutex
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, fresh or not
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl CacheStore for MemoryStore {
    fn read(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CacheError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn write(&self, key: &CacheKey, entry: CacheEntry) -> Result<(), CacheError> {
        self.entries.lock().insert(key.clone(), entry);
        Ok(())
    }
}

/// Suffix counter for temporary files, so concurrent writers never share one
static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Store that persists entries as JSON files on disk
///
/// Entries survive restarts. A file that cannot be parsed is treated as a miss
/// and is overwritten by the next successful write.
#[derive(Debug, Clone)]
pub struct FileStore {
    /// Directory where cache files are stored
    cache_dir: PathBuf,
}

impl FileStore {
    /// Creates a FileStore using the XDG-compliant cache directory
    ///
    /// Returns `None` if the cache directory cannot be determined (e.g., no home directory).
    pub fn new() -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "", "clima-proxy")?;
        let cache_dir = project_dirs.cache_dir().to_path_buf();
        Some(Self { cache_dir })
    }

    /// Creates a FileStore with a custom cache directory
    pub fn with_dir(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    pub fn dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Returns the path to a cache file for the given key
    fn cache_path(&self, key: &CacheKey) -> PathBuf {
        self.cache_dir.join(format!("{}.json", key.file_stem()))
    }

    /// Ensures the cache directory exists
    fn ensure_dir(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.cache_dir)
    }
}

impl CacheStore for FileStore {
    fn read(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CacheError> {
        let content = match fs::read_to_string(self.cache_path(key)) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str(&content) {
            Ok(entry) => Ok(Some(entry)),
            Err(e) => {
                tracing::warn!(%key, error = %e, "Ignoring unreadable cache file");
                Ok(None)
            }
        }
    }

    fn write(&self, key: &CacheKey, entry: CacheEntry) -> Result<(), CacheError> {
        self.ensure_dir()?;

        let json = serde_json::to_string_pretty(&entry)?;
        let path = self.cache_path(key);
        let tmp = path.with_extension(format!(
            "json.{}.{}.tmp",
            std::process::id(),
            TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));

        // Write then rename so readers never see a half-written file
        fs::write(&tmp, json)?;
        if let Err(e) = fs::rename(&tmp, &path) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }
}
