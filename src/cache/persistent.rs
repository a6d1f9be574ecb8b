//! Persistent Tier Module
//!
//! Synchronous, size-constrained, file-per-key store. Holds the data that
//! must survive a restart but is cheap enough to serialize on every write.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::cache::{CacheEntry, CacheKey, STORAGE_KEY_PREFIX};

// == Persistent Tier ==
/// Durable synchronous tier with a byte quota over its key namespace.
///
/// The quota mirrors origin-scoped storage limits: a write that would push
/// the namespace past the quota evicts expired entries and retries exactly
/// once, then drops the write. A dropped write only costs reload survival;
/// the faster and bulk tiers still hold the entry.
#[derive(Debug)]
pub struct PersistentTier {
    dir: PathBuf,
    ttl_ms: u64,
    quota_bytes: u64,
}

impl PersistentTier {
    // == Constructor ==
    /// Opens the tier rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>, ttl_ms: u64, quota_bytes: u64) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            ttl_ms,
            quota_bytes,
        })
    }

    fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(format!("{}.json", key.storage_key()))
    }

    fn is_namespace_file(path: &Path) -> bool {
        path.file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.starts_with(STORAGE_KEY_PREFIX) && name.ends_with(".json"))
            .unwrap_or(false)
    }

    fn namespace_files(&self) -> Vec<PathBuf> {
        let Ok(dir) = fs::read_dir(&self.dir) else {
            return Vec::new();
        };
        dir.filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| Self::is_namespace_file(p))
            .collect()
    }

    /// Bytes currently used by this namespace, excluding `except`.
    fn usage_bytes(&self, except: Option<&Path>) -> u64 {
        self.namespace_files()
            .iter()
            .filter(|p| except.map_or(true, |e| p.as_path() != e))
            .filter_map(|p| fs::metadata(p).ok())
            .map(|m| m.len())
            .sum()
    }

    // == Read ==
    /// Returns the entry for `key`; expired or unreadable files are removed
    /// and reported as absent.
    pub fn read(&self, key: &CacheKey) -> Option<CacheEntry> {
        let path = self.path_for(key);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return None,
            Err(err) => {
                warn!(key = %key, error = %err, "persistent tier read failed");
                return None;
            }
        };

        let entry: CacheEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(err) => {
                // Corrupt file: drop it rather than fail every future read
                warn!(key = %key, error = %err, "discarding unparseable persistent entry");
                let _ = fs::remove_file(&path);
                return None;
            }
        };

        if entry.is_expired(self.ttl_ms) {
            let _ = fs::remove_file(&path);
            return None;
        }

        Some(entry)
    }

    // == Write ==
    /// Stores `entry` under `key`. Returns whether the entry was persisted.
    ///
    /// On quota exhaustion, expired namespace entries are evicted and the
    /// write retried exactly once; a second failure drops the write.
    pub fn write(&self, key: &CacheKey, entry: &CacheEntry) -> bool {
        let serialized = match serde_json::to_string(entry) {
            Ok(serialized) => serialized,
            Err(err) => {
                warn!(key = %key, error = %err, "persistent tier serialization failed");
                return false;
            }
        };
        let path = self.path_for(key);

        if self.write_within_quota(&path, &serialized) {
            return true;
        }

        let evicted = self.sweep_expired();
        debug!(key = %key, evicted, "persistent quota exceeded, retrying after eviction");
        if self.write_within_quota(&path, &serialized) {
            return true;
        }

        warn!(key = %key, "persistent tier write dropped after quota eviction");
        false
    }

    fn write_within_quota(&self, path: &Path, serialized: &str) -> bool {
        let projected = self.usage_bytes(Some(path)) + serialized.len() as u64;
        if projected > self.quota_bytes {
            return false;
        }
        match fs::write(path, serialized) {
            Ok(()) => true,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "persistent tier write failed");
                false
            }
        }
    }

    // == Delete ==
    /// Removes the entry for `key`, if present.
    pub fn delete(&self, key: &CacheKey) {
        let _ = fs::remove_file(self.path_for(key));
    }

    // == Clear ==
    /// Removes every entry in this tier's namespace. Files outside the
    /// namespace prefix share the directory and are left alone.
    pub fn clear(&self) {
        for path in self.namespace_files() {
            let _ = fs::remove_file(&path);
        }
    }

    // == Sweep ==
    /// Removes expired or unreadable namespace entries, returning how many
    /// files were dropped.
    pub fn sweep_expired(&self) -> usize {
        let mut removed = 0;
        for path in self.namespace_files() {
            let drop_file = match fs::read_to_string(&path) {
                Ok(raw) => match serde_json::from_str::<CacheEntry>(&raw) {
                    Ok(entry) => entry.is_expired(self.ttl_ms),
                    Err(_) => true,
                },
                Err(_) => true,
            };
            if drop_file && fs::remove_file(&path).is_ok() {
                removed += 1;
            }
        }
        removed
    }

    // == Stats ==
    /// Number of files currently held in the namespace.
    pub fn len(&self) -> usize {
        self.namespace_files().len()
    }

    /// Returns true when the namespace holds no files.
    pub fn is_empty(&self) -> bool {
        self.namespace_files().is_empty()
    }

    /// Bytes currently used by the namespace.
    pub fn size_bytes(&self) -> u64 {
        self.usage_bytes(None)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::entry::current_timestamp_ms;
    use crate::cache::CACHE_VERSION;
    use crate::tree::{NodeKind, TreeNode};
    use tempfile::TempDir;

    const DAY_MS: u64 = 24 * 60 * 60 * 1000;

    fn entry_for(key: &CacheKey) -> CacheEntry {
        let root = TreeNode::new(key.root_id(), "Root", NodeKind::Root);
        CacheEntry::build(key, root, CACHE_VERSION)
    }

    fn open_tier(dir: &TempDir, quota: u64) -> PersistentTier {
        PersistentTier::open(dir.path(), DAY_MS, quota).unwrap()
    }

    #[test]
    fn test_write_read_round_trip() {
        let dir = TempDir::new().unwrap();
        let tier = open_tier(&dir, 1024 * 1024);
        let key = CacheKey::new("root-1");

        assert!(tier.write(&key, &entry_for(&key)));
        let read = tier.read(&key).unwrap();
        assert_eq!(read.metadata.root_key, "root-1");
    }

    #[test]
    fn test_read_missing_key() {
        let dir = TempDir::new().unwrap();
        let tier = open_tier(&dir, 1024 * 1024);
        assert!(tier.read(&CacheKey::new("missing")).is_none());
    }

    #[test]
    fn test_expired_entry_removed_on_read() {
        let dir = TempDir::new().unwrap();
        let tier = open_tier(&dir, 1024 * 1024);
        let key = CacheKey::new("root-1");

        let mut entry = entry_for(&key);
        entry.metadata.timestamp = current_timestamp_ms() - DAY_MS - 1;
        assert!(tier.write(&key, &entry));

        assert!(tier.read(&key).is_none());
        assert!(tier.is_empty());
    }

    #[test]
    fn test_corrupt_file_removed_on_read() {
        let dir = TempDir::new().unwrap();
        let tier = open_tier(&dir, 1024 * 1024);
        let key = CacheKey::new("root-1");

        fs::write(tier.path_for(&key), "not json").unwrap();
        assert!(tier.read(&key).is_none());
        assert!(tier.is_empty());
    }

    #[test]
    fn test_quota_eviction_then_retry() {
        let dir = TempDir::new().unwrap();
        let key = CacheKey::new("root-1");
        let entry = entry_for(&key);
        let entry_size = serde_json::to_string(&entry).unwrap().len() as u64;

        // Quota fits roughly one entry
        let tier = PersistentTier::open(dir.path(), DAY_MS, entry_size + 64).unwrap();

        // Fill the namespace with an expired entry
        let stale_key = CacheKey::new("stale");
        let mut stale = entry_for(&stale_key);
        stale.metadata.timestamp = current_timestamp_ms() - DAY_MS - 1;
        assert!(tier.write(&stale_key, &stale));

        // The new write exceeds quota until the expired entry is evicted
        assert!(tier.write(&key, &entry));
        assert!(tier.read(&key).is_some());
        assert!(tier.read(&stale_key).is_none());
    }

    #[test]
    fn test_quota_drop_when_eviction_insufficient() {
        let dir = TempDir::new().unwrap();
        let key = CacheKey::new("root-1");
        let entry = entry_for(&key);
        let entry_size = serde_json::to_string(&entry).unwrap().len() as u64;

        let tier = PersistentTier::open(dir.path(), DAY_MS, entry_size.saturating_sub(1)).unwrap();

        // Nothing to evict and the entry alone exceeds quota: dropped
        assert!(!tier.write(&key, &entry));
        assert!(tier.read(&key).is_none());
    }

    #[test]
    fn test_overwrite_does_not_double_count_quota() {
        let dir = TempDir::new().unwrap();
        let key = CacheKey::new("root-1");
        let entry = entry_for(&key);
        let entry_size = serde_json::to_string(&entry).unwrap().len() as u64;

        let tier = PersistentTier::open(dir.path(), DAY_MS, entry_size + 16).unwrap();

        assert!(tier.write(&key, &entry));
        // Rewriting the same key replaces the old bytes instead of adding
        assert!(tier.write(&key, &entry));
        assert_eq!(tier.len(), 1);
    }

    #[test]
    fn test_clear_leaves_foreign_files_alone() {
        let dir = TempDir::new().unwrap();
        let tier = open_tier(&dir, 1024 * 1024);
        let key = CacheKey::new("root-1");
        assert!(tier.write(&key, &entry_for(&key)));

        let foreign = dir.path().join("unrelated.json");
        fs::write(&foreign, "{}").unwrap();

        tier.clear();
        assert!(tier.is_empty());
        assert!(foreign.exists());
    }

    #[test]
    fn test_sweep_expired_counts() {
        let dir = TempDir::new().unwrap();
        let tier = open_tier(&dir, 1024 * 1024);

        let fresh = CacheKey::new("fresh");
        assert!(tier.write(&fresh, &entry_for(&fresh)));

        let stale = CacheKey::new("stale");
        let mut entry = entry_for(&stale);
        entry.metadata.timestamp = current_timestamp_ms() - DAY_MS - 1;
        assert!(tier.write(&stale, &entry));

        assert_eq!(tier.sweep_expired(), 1);
        assert_eq!(tier.len(), 1);
    }
}
