//! Configuration schema for revcache
//!
//! Configuration is stored at `~/.config/revcache/config.toml`

use crate::cache::{CacheStorage, FallbackPolicy, DEFAULT_JOBS};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Cache settings
    pub cache: CacheConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// What the archives contain, used in messages (e.g. "mathlib")
    pub subject: String,

    /// Local storage root (default: `<data dir>/revcache`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_dir: Option<PathBuf>,

    /// Remote mirror base URL; archives live at `<url>/<rev>.<ext>`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_url: Option<String>,

    /// Archive file extension, without the leading dot
    pub archive_ext: String,

    /// Policy when the exact revision has no archive
    pub fallback: FallbackPolicy,

    /// Maximum concurrent downloads for `download-all`
    pub jobs: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            subject: "artifact".to_string(),
            storage_dir: None,
            remote_url: None,
            archive_ext: "tar.xz".to_string(),
            fallback: FallbackPolicy::default(),
            jobs: DEFAULT_JOBS,
        }
    }
}

impl CacheConfig {
    /// Default storage root under the platform data directory
    pub fn default_storage_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("revcache")
    }

    /// Storage handle for `storage_dir`, or the platform default
    pub fn storage(&self) -> CacheStorage {
        let root = self
            .storage_dir
            .clone()
            .unwrap_or_else(Self::default_storage_dir);
        CacheStorage::new(root, &self.archive_ext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("[general]"));
        assert!(toml.contains("[cache]"));
        assert!(toml.contains(r#"fallback = "show""#));
        assert!(!toml.contains("remote_url"));
    }

    #[test]
    fn config_deserializes_empty() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.cache.archive_ext, "tar.xz");
        assert_eq!(config.cache.jobs, DEFAULT_JOBS);
    }

    #[test]
    fn config_deserializes_partial() {
        let toml = r#"
            [cache]
            subject = "mathlib"
            remote_url = "https://cache.example/mathlib"
            fallback = "download-first"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.cache.subject, "mathlib");
        assert_eq!(config.cache.fallback, FallbackPolicy::DownloadFirst);
        assert_eq!(config.general.log_format, "text"); // default preserved
    }

    #[test]
    fn unknown_policy_rejected() {
        let toml = r#"
            [cache]
            fallback = "sometimes"
        "#;
        assert!(toml::from_str::<Config>(toml).is_err());
    }

    #[test]
    fn storage_root_from_config_or_default() {
        let cache = CacheConfig {
            storage_dir: Some(PathBuf::from("/from/file")),
            ..Default::default()
        };
        assert_eq!(cache.storage().root(), PathBuf::from("/from/file"));

        let cache = CacheConfig::default();
        assert_eq!(cache.storage().root(), CacheConfig::default_storage_dir());
    }
}
