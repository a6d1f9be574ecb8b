//! Configuration Module
//!
//! Handles loading and managing service configuration from environment
//! variables.

use std::env;
use std::path::PathBuf;

use crate::cache::TierOptions;

/// Service configuration parameters.
///
/// All values can be configured via environment variables with sensible
/// defaults. TTLs follow the tier design: memory is rebuilt per session and
/// expires quickly, the durable tiers exist to survive restarts and hold
/// entries for a day.
#[derive(Debug, Clone)]
pub struct Config {
    /// Memory tier TTL in seconds
    pub memory_ttl_secs: u64,
    /// Persistent/bulk tier TTL in seconds
    pub durable_ttl_secs: u64,
    /// Persistent tier namespace byte quota
    pub persistent_quota_bytes: u64,
    /// Root directory for the durable tiers
    pub storage_dir: PathBuf,
    /// Base URL of the tree-source node API
    pub source_base_url: String,
    /// Background poll interval in seconds for observed keys (0 disables)
    pub poll_interval_secs: u64,
    /// Expired-entry sweep interval in seconds
    pub cleanup_interval_secs: u64,
    /// Root keys preloaded at startup
    pub warm_keys: Vec<String>,
    /// HTTP server port
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MEMORY_TTL_SECS` - Memory tier TTL (default: 300)
    /// - `DURABLE_TTL_SECS` - Persistent/bulk tier TTL (default: 86400)
    /// - `PERSISTENT_QUOTA_BYTES` - Persistent namespace quota (default: 5 MiB)
    /// - `STORAGE_DIR` - Durable tier root directory (default: ./cache-data)
    /// - `SOURCE_BASE_URL` - Tree source API base (default: http://localhost:5001/api)
    /// - `POLL_INTERVAL_SECS` - Poll cadence for observed keys (default: 300, 0 = off)
    /// - `CLEANUP_INTERVAL_SECS` - Sweep frequency (default: 3600)
    /// - `WARM_KEYS` - Comma-separated root keys to preload (default: empty)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    pub fn from_env() -> Self {
        Self {
            memory_ttl_secs: env_parsed("MEMORY_TTL_SECS", 300),
            durable_ttl_secs: env_parsed("DURABLE_TTL_SECS", 24 * 60 * 60),
            persistent_quota_bytes: env_parsed("PERSISTENT_QUOTA_BYTES", 5 * 1024 * 1024),
            storage_dir: env::var("STORAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("cache-data")),
            source_base_url: env::var("SOURCE_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:5001/api".to_string()),
            poll_interval_secs: env_parsed("POLL_INTERVAL_SECS", 300),
            cleanup_interval_secs: env_parsed("CLEANUP_INTERVAL_SECS", 3600),
            warm_keys: env::var("WARM_KEYS")
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|key| !key.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            server_port: env_parsed("SERVER_PORT", 3000),
        }
    }

    /// Tier construction parameters derived from this configuration.
    pub fn tier_options(&self) -> TierOptions {
        TierOptions {
            memory_ttl_ms: self.memory_ttl_secs * 1000,
            persistent_dir: self.storage_dir.join("persistent"),
            persistent_ttl_ms: self.durable_ttl_secs * 1000,
            persistent_quota_bytes: self.persistent_quota_bytes,
            bulk_dir: self.storage_dir.join("bulk"),
            bulk_ttl_ms: self.durable_ttl_secs * 1000,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            memory_ttl_secs: 300,
            durable_ttl_secs: 24 * 60 * 60,
            persistent_quota_bytes: 5 * 1024 * 1024,
            storage_dir: PathBuf::from("cache-data"),
            source_base_url: "http://localhost:5001/api".to_string(),
            poll_interval_secs: 300,
            cleanup_interval_secs: 3600,
            warm_keys: Vec::new(),
            server_port: 3000,
        }
    }
}

fn env_parsed<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.memory_ttl_secs, 300);
        assert_eq!(config.durable_ttl_secs, 86400);
        assert_eq!(config.persistent_quota_bytes, 5 * 1024 * 1024);
        assert_eq!(config.poll_interval_secs, 300);
        assert_eq!(config.server_port, 3000);
        assert!(config.warm_keys.is_empty());
    }

    #[test]
    fn test_tier_options_mapping() {
        let config = Config::default();
        let options = config.tier_options();
        assert_eq!(options.memory_ttl_ms, 300_000);
        assert_eq!(options.persistent_ttl_ms, 86_400_000);
        assert_eq!(options.bulk_ttl_ms, 86_400_000);
        assert!(options.persistent_dir.ends_with("persistent"));
        assert!(options.bulk_dir.ends_with("bulk"));
    }

    #[test]
    fn test_warm_keys_parsing() {
        env::set_var("WARM_KEYS", "reality-root, constraints-of-reality ,");
        let config = Config::from_env();
        env::remove_var("WARM_KEYS");

        assert_eq!(
            config.warm_keys,
            vec!["reality-root", "constraints-of-reality"]
        );
    }
}
