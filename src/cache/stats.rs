//! Cache Statistics Module
//!
//! Tracks coordinator performance counters and per-tier occupancy.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Cache Counters ==
/// Live counters updated by the coordinator on every read.
#[derive(Debug, Default)]
pub struct CacheCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    promotions: AtomicU64,
}

impl CacheCounters {
    /// Creates counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments the hit counter.
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the miss counter.
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the promotion counter (a hit found below the memory tier).
    pub fn record_promotion(&self) {
        self.promotions.fetch_add(1, Ordering::Relaxed);
    }

    /// Current hit count.
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Current miss count.
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Current promotion count.
    pub fn promotions(&self) -> u64 {
        self.promotions.load(Ordering::Relaxed)
    }
}

// == Cache Stats ==
/// Point-in-time snapshot of cache performance and tier occupancy.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Number of reads served from any tier
    pub hits: u64,
    /// Number of reads that missed every tier
    pub misses: u64,
    /// Number of hits promoted upward from a slower tier
    pub promotions: u64,
    /// Entries currently held by the memory tier
    pub memory_entries: usize,
    /// Entries currently held by the persistent tier namespace
    pub persistent_entries: usize,
    /// Bytes used by the persistent tier namespace
    pub persistent_bytes: u64,
    /// Entries currently held by the bulk tier namespace
    pub bulk_entries: usize,
    /// Whether the bulk tier opened successfully
    pub bulk_available: bool,
}

impl CacheStats {
    // == Hit Rate ==
    /// Hits over total reads, 0.0 when nothing has been read yet.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
