//! Read-through cache for upstream weather lookups
//!
//! `CacheManager::get_or_compute` returns a fresh cached value when one exists and
//! otherwise runs the supplied fetch, storing its result with a caller-chosen TTL.
//! Failures are never cached and stale values are never served. Storage and time
//! are injectable: entries live in memory by default, or as JSON files on disk.

mod clock;
mod key;
mod manager;
mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use key::CacheKey;
pub use manager::CacheManager;
pub use store::{CacheEntry, CacheError, CacheStore, FileStore, MemoryStore};
