//! Indexed binary min-heap behind a mutex
//!
//! The side index maps each id to its current slot so that `update` and
//! `delete` can re-heapify from an arbitrary position.

use super::{CacheManager, DEFAULT_PRIORITY_DELTA};
use crate::error::{Result, ScalingError};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Clone)]
struct HeapEntry {
    id: String,
    priority: i64,
}

#[derive(Debug, Default)]
struct IndexedHeap {
    entries: Vec<HeapEntry>,
    /// id -> position in `entries`
    index: HashMap<String, usize>,
}

impl IndexedHeap {
    fn len(&self) -> usize {
        self.entries.len()
    }

    fn push(&mut self, id: &str, priority: i64) -> Result<()> {
        if self.index.contains_key(id) {
            return Err(ScalingError::AlreadyExists(id.to_string()));
        }
        let pos = self.entries.len();
        self.entries.push(HeapEntry {
            id: id.to_string(),
            priority,
        });
        self.index.insert(id.to_string(), pos);
        self.sift_up(pos);
        Ok(())
    }

    fn set_priority(&mut self, id: &str, priority: i64) -> Result<()> {
        let pos = *self
            .index
            .get(id)
            .ok_or_else(|| ScalingError::KeyNotFound(id.to_string()))?;
        self.entries[pos].priority = priority;
        self.fix(pos);
        Ok(())
    }

    fn priority(&self, id: &str) -> Result<i64> {
        self.index
            .get(id)
            .map(|&pos| self.entries[pos].priority)
            .ok_or_else(|| ScalingError::KeyNotFound(id.to_string()))
    }

    fn remove(&mut self, id: &str) -> Result<HeapEntry> {
        let pos = *self
            .index
            .get(id)
            .ok_or_else(|| ScalingError::KeyNotFound(id.to_string()))?;
        self.remove_at(pos)
            .ok_or_else(|| ScalingError::KeyNotFound(id.to_string()))
    }

    fn remove_at(&mut self, pos: usize) -> Option<HeapEntry> {
        let last = self.entries.len().checked_sub(1)?;
        self.swap(pos, last);
        let removed = self.entries.pop()?;
        self.index.remove(&removed.id);
        if pos < self.entries.len() {
            self.fix(pos);
        }
        Some(removed)
    }

    fn fix(&mut self, pos: usize) {
        if !self.sift_down(pos) {
            self.sift_up(pos);
        }
    }

    fn sift_up(&mut self, mut pos: usize) {
        while pos > 0 {
            let parent = (pos - 1) / 2;
            if self.entries[pos].priority >= self.entries[parent].priority {
                break;
            }
            self.swap(pos, parent);
            pos = parent;
        }
    }

    /// Returns whether the entry moved
    fn sift_down(&mut self, start: usize) -> bool {
        let len = self.entries.len();
        let mut pos = start;
        loop {
            let left = 2 * pos + 1;
            if left >= len {
                break;
            }
            let right = left + 1;
            let mut smallest = left;
            if right < len && self.entries[right].priority < self.entries[left].priority {
                smallest = right;
            }
            if self.entries[smallest].priority >= self.entries[pos].priority {
                break;
            }
            self.swap(pos, smallest);
            pos = smallest;
        }
        pos > start
    }

    fn swap(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        self.entries.swap(a, b);
        self.index.insert(self.entries[a].id.clone(), a);
        self.index.insert(self.entries[b].id.clone(), b);
    }
}

/// Thread-safe keyed min-priority queue
#[derive(Debug, Default)]
pub struct LruCacheManager {
    heap: Mutex<IndexedHeap>,
}

impl LruCacheManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.heap.lock().unwrap().len()
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheManager for LruCacheManager {
    fn add(&self, id: &str, priority: i64) -> Result<()> {
        self.heap.lock().unwrap().push(id, priority)
    }

    fn update(&self, id: &str, priority: i64) -> Result<()> {
        self.heap.lock().unwrap().set_priority(id, priority)
    }

    fn update_default(&self, id: &str) -> Result<()> {
        let mut heap = self.heap.lock().unwrap();
        let current = heap.priority(id)?;
        heap.set_priority(id, current.saturating_add(DEFAULT_PRIORITY_DELTA))
    }

    fn exists(&self, id: &str) -> bool {
        self.heap.lock().unwrap().index.contains_key(id)
    }

    fn get(&self, id: &str) -> Result<i64> {
        self.heap.lock().unwrap().priority(id)
    }

    fn delete(&self, id: &str) -> Result<()> {
        self.heap.lock().unwrap().remove(id).map(|_| ())
    }

    fn peek(&self) -> Result<(String, i64)> {
        let heap = self.heap.lock().unwrap();
        heap.entries
            .first()
            .map(|e| (e.id.clone(), e.priority))
            .ok_or(ScalingError::Empty)
    }

    fn evict(&self) -> Result<(String, i64)> {
        let mut heap = self.heap.lock().unwrap();
        heap.remove_at(0)
            .map(|entry| (entry.id, entry.priority))
            .ok_or(ScalingError::Empty)
    }

    fn get_items(&self) -> (Vec<String>, Vec<i64>) {
        let heap = self.heap.lock().unwrap();
        heap.entries
            .iter()
            .map(|e| (e.id.clone(), e.priority))
            .unzip()
    }
}
