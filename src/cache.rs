//! # Representation cache - bounded per-entity map owned by the ranker

use crate::analyzer::Representation;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// Cache statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheStats {
    pub total_requests: u64,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub invalidations: u64,
}

/// Entity key -> representation, evicting the oldest insertion when full
#[derive(Debug, Clone)]
pub struct RepresentationCache {
    entries: HashMap<String, Representation>,
    order: VecDeque<String>,
    capacity: usize,
    stats: CacheStats,
}

impl RepresentationCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
            stats: CacheStats::default(),
        }
    }

    pub fn get(&mut self, key: &str) -> Option<&Representation> {
        self.stats.total_requests += 1;
        if self.entries.contains_key(key) {
            self.stats.hits += 1;
        } else {
            self.stats.misses += 1;
        }
        self.entries.get(key)
    }

    pub fn put(&mut self, key: &str, representation: Representation) {
        if self.entries.contains_key(key) {
            self.order.retain(|k| k != key);
        } else if self.entries.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
                self.stats.evictions += 1;
            }
        }

        self.order.push_back(key.to_string());
        self.entries.insert(key.to_string(), representation);
    }

    /// Fetch from cache or compute and remember
    pub fn get_or_insert_with(
        &mut self,
        key: &str,
        compute: impl FnOnce() -> Representation,
    ) -> Representation {
        if let Some(hit) = self.get(key) {
            return hit.clone();
        }
        let representation = compute();
        self.put(key, representation.clone());
        representation
    }

    /// Drop a stale entry; returns whether one existed
    pub fn invalidate(&mut self, key: &str) -> bool {
        let removed = self.entries.remove(key).is_some();
        if removed {
            self.order.retain(|k| k != key);
            self.stats.invalidations += 1;
        }
        removed
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }
}
