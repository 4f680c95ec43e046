//! Read-through cache manager
//!
//! Provides a `CacheManager` that returns a fresh cached value when one exists
//! and otherwise runs the supplied fetch, stores its result with an expiry, and
//! returns it. Failed fetches are never stored.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Duration;
use serde::{de::DeserializeOwned, Serialize};

use super::{CacheEntry, CacheKey, CacheStore, Clock, FileStore, MemoryStore, SystemClock};

/// Read-through cache over a pluggable store and clock
///
/// Cheap to clone; clones share the same store. Values are kept as JSON so a
/// single manager can cache results of different types under different keys.
#[derive(Debug, Clone)]
pub struct CacheManager {
    store: Arc<dyn CacheStore>,
    clock: Arc<dyn Clock>,
}

impl CacheManager {
    /// Creates a CacheManager over the given store and clock
    pub fn new(store: Arc<dyn CacheStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Creates a CacheManager backed by process memory and wall-clock time
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()), Arc::new(SystemClock))
    }

    /// Creates a CacheManager persisting entries under `cache_dir`
    pub fn with_dir(cache_dir: PathBuf) -> Self {
        Self::new(Arc::new(FileStore::with_dir(cache_dir)), Arc::new(SystemClock))
    }

    /// The clock used to judge freshness
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Returns the value cached under `key` if it is still fresh, otherwise
    /// awaits `compute`, stores its result for `ttl`, and returns it.
    ///
    /// `compute` runs at most once per call. If it fails, nothing is stored and
    /// the error is returned unchanged. Concurrent callers missing on the same
    /// key may each run their own `compute`; the last write wins.
    pub async fn get_or_compute<T, E, F, Fut>(
        &self,
        key: &CacheKey,
        ttl: Duration,
        compute: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(value) = self.lookup(key) {
            tracing::debug!(%key, "cache hit");
            return Ok(value);
        }

        tracing::debug!(%key, "cache miss");
        let value = compute().await?;
        self.store_value(key, ttl, &value);
        Ok(value)
    }

    /// Fresh value under `key`, if any
    fn lookup<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let entry = match self.store.read(key) {
            Ok(Some(entry)) => entry,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(%key, error = %e, "cache read failed, treating as miss");
                return None;
            }
        };

        if !entry.is_fresh(self.clock.now()) {
            tracing::debug!(%key, expired_at = %entry.expires_at, "cache entry stale");
            return None;
        }

        match serde_json::from_value(entry.value) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(%key, error = %e, "cached value has unexpected shape, treating as miss");
                None
            }
        }
    }

    /// Stores `value` under `key`; failures are logged, never surfaced
    fn store_value<T: Serialize>(&self, key: &CacheKey, ttl: Duration, value: &T) {
        let json = match serde_json::to_value(value) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(%key, error = %e, "could not serialize value for cache");
                return;
            }
        };

        let entry = CacheEntry::new(json, self.clock.now(), ttl);
        if let Err(e) = self.store.write(key, entry) {
            tracing::warn!(%key, error = %e, "cache write failed");
        }
    }
}
