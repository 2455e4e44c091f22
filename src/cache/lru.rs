//! LRU Tracker Module
//!
//! Recency ordering for the in-memory pool's eviction.

use std::collections::{BTreeMap, HashMap};

// == LRU Tracker ==
/// Tracks key recency with a monotonically increasing tick.
///
/// `ticks` maps key → last tick, `order` maps tick → key, so the oldest key
/// is the first entry of `order`.
#[derive(Debug, Default)]
pub struct LruTracker {
    ticks: HashMap<String, u64>,
    order: BTreeMap<u64, String>,
    clock: u64,
}

impl LruTracker {
    pub fn new() -> Self {
        Self::default()
    }

    // == Touch ==
    /// Marks `key` as most recently used.
    pub fn touch(&mut self, key: &str) {
        self.clock += 1;
        if let Some(previous) = self.ticks.insert(key.to_string(), self.clock) {
            self.order.remove(&previous);
        }
        self.order.insert(self.clock, key.to_string());
    }

    pub fn remove(&mut self, key: &str) {
        if let Some(tick) = self.ticks.remove(key) {
            self.order.remove(&tick);
        }
    }

    // == Evict Oldest ==
    /// Removes and returns the least recently used key.
    pub fn evict_oldest(&mut self) -> Option<String> {
        let (_, key) = self.order.pop_first()?;
        self.ticks.remove(&key);
        Some(key)
    }

    pub fn clear(&mut self) {
        self.ticks.clear();
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evicts_in_insertion_order() {
        let mut lru = LruTracker::new();
        lru.touch("a");
        lru.touch("b");
        lru.touch("c");

        assert_eq!(lru.evict_oldest(), Some("a".to_string()));
        assert_eq!(lru.evict_oldest(), Some("b".to_string()));
        assert_eq!(lru.len(), 1);
    }

    #[test]
    fn test_touch_refreshes_recency() {
        let mut lru = LruTracker::new();
        lru.touch("a");
        lru.touch("b");
        lru.touch("a");

        assert_eq!(lru.len(), 2);
        assert_eq!(lru.evict_oldest(), Some("b".to_string()));
        assert_eq!(lru.evict_oldest(), Some("a".to_string()));
        assert!(lru.is_empty());
    }

    #[test]
    fn test_remove_and_clear() {
        let mut lru = LruTracker::new();
        lru.touch("a");
        lru.touch("b");
        lru.remove("a");
        lru.remove("missing");

        assert_eq!(lru.len(), 1);
        assert_eq!(lru.evict_oldest(), Some("b".to_string()));

        lru.touch("c");
        lru.clear();
        assert_eq!(lru.evict_oldest(), None);
    }
}
