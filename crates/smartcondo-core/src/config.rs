//! Application configuration management.
//!
//! This module handles loading and saving the console configuration:
//! backend URL, last used username and the statement screen's cache and
//! notice policies.
//!
//! Configuration is stored at `~/.config/smartcondo/config.json`.

use std::path::PathBuf;

use anyhow::Result;
use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "smartcondo";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable overriding the backend URL
pub const API_URL_ENV: &str = "SMARTCONDO_API_URL";

/// Backend used when nothing else is configured
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";

/// Cached account snapshots older than this are refetched on restore.
const DEFAULT_SNAPSHOT_MAX_AGE_MINUTES: i64 = 30;

/// How long success/error notices stay on screen.
const DEFAULT_NOTICE_SECONDS: u64 = 4;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub api_base_url: Option<String>,
    pub last_username: Option<String>,
    /// `0` disables restoring cached snapshots entirely.
    pub snapshot_max_age_minutes: Option<i64>,
    pub notice_seconds: Option<u64>,
    pub receipts_dir: Option<PathBuf>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Backend URL: environment first, then config file, then the default.
    pub fn api_base_url(&self) -> String {
        Self::resolve_api_base_url(std::env::var(API_URL_ENV).ok(), self.api_base_url.clone())
    }

    fn resolve_api_base_url(from_env: Option<String>, from_config: Option<String>) -> String {
        from_env
            .filter(|s| !s.trim().is_empty())
            .or(from_config.filter(|s| !s.trim().is_empty()))
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string()
    }

    /// Maximum age of a cached snapshot that may be shown without refetching.
    /// `None` means cached snapshots are never trusted.
    pub fn snapshot_max_age(&self) -> Option<Duration> {
        match self.snapshot_max_age_minutes.unwrap_or(DEFAULT_SNAPSHOT_MAX_AGE_MINUTES) {
            minutes if minutes <= 0 => None,
            minutes => Some(Duration::minutes(minutes)),
        }
    }

    pub fn notice_ttl(&self) -> Duration {
        let seconds = self.notice_seconds.unwrap_or(DEFAULT_NOTICE_SECONDS).min(3600);
        Duration::seconds(seconds as i64)
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Directory backing the statement screen's session store.
    pub fn session_store_dir(&self) -> Result<PathBuf> {
        Ok(self.cache_dir()?.join("session_store"))
    }

    pub fn log_dir(&self) -> Result<PathBuf> {
        Ok(self.cache_dir()?.join("logs"))
    }

    /// Where downloaded receipt PDFs are written.
    pub fn receipts_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.receipts_dir {
            return Ok(dir.clone());
        }
        match dirs::download_dir() {
            Some(downloads) => Ok(downloads.join(APP_NAME)),
            None => Ok(self.cache_dir()?.join("receipts")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_api_base_url() {
        assert_eq!(Config::resolve_api_base_url(None, None), DEFAULT_API_BASE_URL);
        assert_eq!(
            Config::resolve_api_base_url(None, Some("https://condo.example/api/".to_string())),
            "https://condo.example/api"
        );
        assert_eq!(
            Config::resolve_api_base_url(
                Some("http://10.0.0.5:8000/api".to_string()),
                Some("https://condo.example/api".to_string())
            ),
            "http://10.0.0.5:8000/api"
        );
        assert_eq!(
            Config::resolve_api_base_url(Some("  ".to_string()), None),
            DEFAULT_API_BASE_URL
        );
    }

    #[test]
    fn test_snapshot_max_age_policy() {
        let config = Config::default();
        assert_eq!(config.snapshot_max_age(), Some(Duration::minutes(30)));

        let disabled = Config {
            snapshot_max_age_minutes: Some(0),
            ..Config::default()
        };
        assert_eq!(disabled.snapshot_max_age(), None);
    }

    #[test]
    fn test_notice_ttl_default() {
        assert_eq!(Config::default().notice_ttl(), Duration::seconds(4));
    }
}
