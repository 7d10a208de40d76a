//! Priority cache — keyed min-priority queue used for eviction ordering
//!
//! Entries are `(id, priority)` pairs, unique by id. The entry with the
//! smallest priority is the next to be evicted.

pub mod lru;

pub use lru::LruCacheManager;

use crate::error::Result;

/// Priority assigned by [`CacheManager::add_default`]
pub const DEFAULT_PRIORITY: i64 = 0;

/// Amount added by [`CacheManager::update_default`]
pub const DEFAULT_PRIORITY_DELTA: i64 = 1;

/// Keyed priority queue with O(log n) arbitrary update and delete
pub trait CacheManager: Send + Sync {
    /// Insert a new id. Fails if the id already exists.
    fn add(&self, id: &str, priority: i64) -> Result<()>;

    /// Insert a new id with [`DEFAULT_PRIORITY`]
    fn add_default(&self, id: &str) -> Result<()> {
        self.add(id, DEFAULT_PRIORITY)
    }

    /// Replace the priority of an existing id. Fails if the id is absent.
    fn update(&self, id: &str, priority: i64) -> Result<()>;

    /// Raise the priority of an existing id by [`DEFAULT_PRIORITY_DELTA`]
    fn update_default(&self, id: &str) -> Result<()> {
        let current = self.get(id)?;
        self.update(id, current.saturating_add(DEFAULT_PRIORITY_DELTA))
    }

    /// Whether the id is present
    fn exists(&self, id: &str) -> bool;

    /// Current priority of an id
    fn get(&self, id: &str) -> Result<i64>;

    /// Remove an id. Fails if the id is absent.
    fn delete(&self, id: &str) -> Result<()>;

    /// Minimum-priority entry, left in place
    fn peek(&self) -> Result<(String, i64)>;

    /// Remove and return the minimum-priority entry
    fn evict(&self) -> Result<(String, i64)>;

    /// Snapshot of all ids and their priorities, in no particular order
    fn get_items(&self) -> (Vec<String>, Vec<i64>);
}
