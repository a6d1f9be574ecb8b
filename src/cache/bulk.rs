//! Bulk Tier Module
//!
//! Asynchronous, larger-capacity backstop. Writes are atomic (temp file plus
//! rename), reads never block the caller, and every failure is logged and
//! treated as absent: this tier is never the only copy of an entry.

use std::io;
use std::path::PathBuf;

use tokio::fs;
use tracing::warn;

use crate::cache::{CacheEntry, CacheKey, STORAGE_KEY_PREFIX};

// == Bulk Tier ==
/// Durable asynchronous tier without a byte quota.
#[derive(Debug)]
pub struct BulkTier {
    dir: PathBuf,
    ttl_ms: u64,
}

impl BulkTier {
    // == Constructor ==
    /// Opens the tier rooted at `dir`, creating the directory if needed.
    ///
    /// An open failure means the environment cannot provide bulk storage;
    /// the coordinator degrades to the remaining tiers.
    pub async fn open(dir: impl Into<PathBuf>, ttl_ms: u64) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await?;
        Ok(Self { dir, ttl_ms })
    }

    fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(format!("{}.json", key.storage_key()))
    }

    async fn namespace_files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        let Ok(mut dir) = fs::read_dir(&self.dir).await else {
            return files;
        };
        while let Ok(Some(dir_entry)) = dir.next_entry().await {
            let path = dir_entry.path();
            let in_namespace = path
                .file_name()
                .and_then(|name| name.to_str())
                .map(|name| name.starts_with(STORAGE_KEY_PREFIX) && name.ends_with(".json"))
                .unwrap_or(false);
            if in_namespace {
                files.push(path);
            }
        }
        files
    }

    // == Read ==
    /// Returns the entry for `key`; expired or unreadable files are removed
    /// and reported as absent. Never returns an error.
    pub async fn read(&self, key: &CacheKey) -> Option<CacheEntry> {
        let path = self.path_for(key);
        let raw = match fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return None,
            Err(err) => {
                warn!(key = %key, error = %err, "bulk tier read failed");
                return None;
            }
        };

        let entry: CacheEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(err) => {
                warn!(key = %key, error = %err, "discarding unparseable bulk entry");
                let _ = fs::remove_file(&path).await;
                return None;
            }
        };

        if entry.is_expired(self.ttl_ms) {
            let _ = fs::remove_file(&path).await;
            return None;
        }

        Some(entry)
    }

    // == Write ==
    /// Stores `entry` under `key`.
    ///
    /// The entry is written to a temp file and renamed into place, so a
    /// reader observes either the previous entry or the new one, never a
    /// partial write. Failures are logged and swallowed.
    pub async fn write(&self, key: &CacheKey, entry: &CacheEntry) {
        let serialized = match serde_json::to_string(entry) {
            Ok(serialized) => serialized,
            Err(err) => {
                warn!(key = %key, error = %err, "bulk tier serialization failed");
                return;
            }
        };

        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");

        if let Err(err) = fs::write(&tmp, serialized).await {
            warn!(key = %key, error = %err, "bulk tier write failed");
            return;
        }
        if let Err(err) = fs::rename(&tmp, &path).await {
            warn!(key = %key, error = %err, "bulk tier commit failed");
            let _ = fs::remove_file(&tmp).await;
        }
    }

    // == Delete ==
    /// Removes the entry for `key`, if present.
    pub async fn delete(&self, key: &CacheKey) {
        let _ = fs::remove_file(self.path_for(key)).await;
    }

    // == Clear ==
    /// Removes every entry in this tier's namespace.
    pub async fn clear(&self) {
        for path in self.namespace_files().await {
            let _ = fs::remove_file(&path).await;
        }
    }

    // == Sweep ==
    /// Removes expired or unreadable namespace entries, returning how many
    /// files were dropped.
    pub async fn sweep_expired(&self) -> usize {
        let mut removed = 0;
        for path in self.namespace_files().await {
            let drop_file = match fs::read_to_string(&path).await {
                Ok(raw) => match serde_json::from_str::<CacheEntry>(&raw) {
                    Ok(entry) => entry.is_expired(self.ttl_ms),
                    Err(_) => true,
                },
                Err(_) => true,
            };
            if drop_file && fs::remove_file(&path).await.is_ok() {
                removed += 1;
            }
        }
        removed
    }

    // == Stats ==
    /// Number of files currently held in the namespace.
    pub async fn len(&self) -> usize {
        self.namespace_files().await.len()
    }
}
