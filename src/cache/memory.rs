//! Memory Tier Module
//!
//! Fastest tier: a process-local map with a short TTL, rebuilt per session.

use std::collections::HashMap;

use crate::cache::{CacheEntry, CacheKey};

// == Memory Tier ==
/// Process-local cache tier.
///
/// Reads and writes never suspend. Entries older than the configured TTL are
/// treated as absent and removed on read, even though the map still holds
/// them until then.
#[derive(Debug)]
pub struct MemoryTier {
    entries: HashMap<CacheKey, CacheEntry>,
    ttl_ms: u64,
}

impl MemoryTier {
    // == Constructor ==
    /// Creates an empty memory tier with the given TTL.
    pub fn new(ttl_ms: u64) -> Self {
        Self {
            entries: HashMap::new(),
            ttl_ms,
        }
    }

    // == Read ==
    /// Returns the entry for `key`, expiring it in place when too old.
    pub fn read(&mut self, key: &CacheKey) -> Option<CacheEntry> {
        let expired = self
            .entries
            .get(key)
            .map(|entry| entry.is_expired(self.ttl_ms))?;

        if expired {
            self.entries.remove(key);
            return None;
        }

        self.entries.get(key).cloned()
    }

    // == Write ==
    /// Stores `entry` under `key`, replacing any previous value.
    pub fn write(&mut self, key: &CacheKey, entry: CacheEntry) {
        self.entries.insert(key.clone(), entry);
    }

    // == Delete ==
    /// Removes the entry for `key`, if present.
    pub fn delete(&mut self, key: &CacheKey) {
        self.entries.remove(key);
    }

    // == Clear ==
    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    // == Sweep ==
    /// Removes all expired entries, returning how many were dropped.
    pub fn sweep_expired(&mut self) -> usize {
        let before = self.entries.len();
        let ttl_ms = self.ttl_ms;
        self.entries.retain(|_, entry| !entry.is_expired(ttl_ms));
        before - self.entries.len()
    }

    // == Length ==
    /// Number of entries currently held, expired or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when no entries are held.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
