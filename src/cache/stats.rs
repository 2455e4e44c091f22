//! Pool Statistics Module
//!
//! Counters kept by pools that support them.

use serde::Serialize;

// == Cache Stats ==
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Reads that found a live slot
    pub hits: u64,
    /// Reads that found nothing, including expired slots
    pub misses: u64,
    /// Slots written
    pub writes: u64,
    /// Slots dropped to make room
    pub evictions: u64,
    /// Slots dropped because their expiry passed
    pub expirations: u64,
    /// Slots currently held
    pub total_entries: usize,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// hits / (hits + misses), or 0.0 before any read.
    pub fn hit_rate(&self) -> f64 {
        let reads = self.hits + self.misses;
        if reads == 0 {
            0.0
        } else {
            self.hits as f64 / reads as f64
        }
    }

    pub fn record_read(&mut self, hit: bool) {
        if hit {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
    }

    pub fn record_write(&mut self) {
        self.writes += 1;
    }

    pub fn record_evictions(&mut self, count: usize) {
        self.evictions += count as u64;
    }

    pub fn record_expirations(&mut self, count: usize) {
        self.expirations += count as u64;
    }
}
