use std::env;
use std::fs;
use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

pub mod credentials;

pub use credentials::{CredentialError, RemoteCredentials};

/// Number of history entries kept in the local window and requested from the
/// remote on every download.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

// ── Cache config ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Path to the redb file backing the local cache.  Overridden at runtime
    /// by `CACHESYNC_CACHE_PATH` when set.
    pub path: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: ".cachesync/cache.redb".to_string(),
        }
    }
}

// ── Remote config ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Master switch.  When `false` the reconcilers run local-only even if
    /// credentials are stored in the cache.
    pub enabled: bool,
    /// Base URL used when the stored credentials do not carry their own
    /// `base_url`.  `CACHESYNC_REMOTE_URL` takes precedence.
    pub base_url: String,
    /// Per-request timeout for the HTTP adapter.
    pub request_timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "https://api.cachesync.dev".to_string(),
            request_timeout_secs: 10,
        }
    }
}

// ── Sync config ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Size of the recent-history window, locally and per download.
    pub history_limit: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub cache: CacheConfig,
    pub remote: RemoteConfig,
    pub sync: SyncConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let mut config = Self::default();
        if let Ok(raw) = fs::read_to_string(path) {
            config = toml::from_str(&raw)?;
        }

        config.apply_overrides(|key| env::var(key).ok());
        Ok(config)
    }

    /// Apply `CACHESYNC_*` overrides using `lookup` to resolve variables.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(value) = lookup("CACHESYNC_CACHE_PATH").filter(|v| !v.is_empty()) {
            self.cache.path = value;
        }
        if let Some(value) = lookup("CACHESYNC_REMOTE_URL").filter(|v| !v.is_empty()) {
            self.remote.base_url = value;
        }

        // A zero-sized window would make every download look empty.
        if self.sync.history_limit == 0 {
            self.sync.history_limit = DEFAULT_HISTORY_LIMIT;
        }
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }

        let rendered = toml::to_string_pretty(self)?;
        fs::write(path, rendered)?;
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.cache.path, ".cachesync/cache.redb");
        assert!(cfg.remote.enabled);
        assert_eq!(cfg.remote.request_timeout_secs, 10);
        assert_eq!(cfg.sync.history_limit, 50);
        assert_eq!(cfg.telemetry.log_level, "info");
    }

    // ── load_from ──────────────────────────────────────────────────────────

    #[test]
    fn load_from_missing_file_returns_defaults() {
        let dir = TempDir::new().unwrap();
        let cfg = AppConfig::load_from(dir.path().join("nonexistent.toml")).unwrap();
        assert_eq!(cfg.sync.history_limit, DEFAULT_HISTORY_LIMIT);
        assert!(cfg.remote.enabled);
    }

    #[test]
    fn load_from_valid_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.toml");
        fs::write(
            &path,
            r#"
[cache]
path = "/tmp/cs/cache.redb"

[remote]
enabled = false
request_timeout_secs = 3

[telemetry]
log_level = "debug"
"#,
        )
        .unwrap();

        let cfg = AppConfig::load_from(&path).unwrap();
        assert_eq!(cfg.cache.path, "/tmp/cs/cache.redb");
        assert!(!cfg.remote.enabled);
        assert_eq!(cfg.remote.request_timeout_secs, 3);
        assert_eq!(cfg.telemetry.log_level, "debug");
        // Unspecified sections should have defaults
        assert_eq!(cfg.sync.history_limit, 50);
    }

    #[test]
    fn load_from_invalid_toml_returns_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "this is not valid toml {{{{").unwrap();
        assert!(AppConfig::load_from(&path).is_err());
    }

    #[test]
    fn zero_history_limit_falls_back_to_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("zero.toml");
        fs::write(&path, "[sync]\nhistory_limit = 0\n").unwrap();
        let cfg = AppConfig::load_from(&path).unwrap();
        assert_eq!(cfg.sync.history_limit, DEFAULT_HISTORY_LIMIT);
    }

    // ── save_to + roundtrip ────────────────────────────────────────────────

    #[test]
    fn save_and_reload_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sub/config.toml");

        let mut cfg = AppConfig::default();
        cfg.remote.base_url = "https://sync.example.com".to_string();
        cfg.sync.history_limit = 20;

        cfg.save_to(&path).unwrap();
        assert!(path.exists());

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.sync.history_limit, 20);
    }

    // ── Env var overrides ──────────────────────────────────────────────────

    #[test]
    fn overrides_replace_file_values() {
        let mut cfg = AppConfig::default();
        cfg.cache.path = "from-file.redb".to_string();
        cfg.apply_overrides(|key| match key {
            "CACHESYNC_CACHE_PATH" => Some("from-env.redb".to_string()),
            "CACHESYNC_REMOTE_URL" => Some("http://localhost:9000".to_string()),
            _ => None,
        });
        assert_eq!(cfg.cache.path, "from-env.redb");
        assert_eq!(cfg.remote.base_url, "http://localhost:9000");
    }

    #[test]
    fn empty_override_is_ignored() {
        let mut cfg = AppConfig::default();
        cfg.apply_overrides(|_| Some(String::new()));
        assert_eq!(cfg.cache.path, ".cachesync/cache.redb");
    }
}
