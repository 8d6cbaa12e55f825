use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use color_eyre::Result;
use color_eyre::eyre::{Context, eyre};
use serde::{Deserialize, Serialize};

use crate::services::matching::TieBreakKind;
use crate::services::migration::MIN_PLAYLIST_SIZE;
use crate::services::spotify::client::DEFAULT_SEARCH_LIMIT;
use crate::spotify_rs::client::{DEFAULT_API_BASE_URL, DEFAULT_TIMEOUT};

/// Built-in iTunes playlists that mirror the whole library rather than a curated list.
pub const DEFAULT_IGNORED_PLAYLISTS: [&str; 6] = [
    "Library",
    "Music",
    "Purchased",
    "Recently Added",
    "Recently Played",
    "Top 25 Most Played",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Path to the iTunes "Library.xml" export
    #[serde(default)]
    library: Option<String>,
    #[serde(default = "default_ignored_playlists")]
    ignored_playlists: Vec<String>,
    #[serde(default)]
    pub spotify: SpotifyConfig,
    #[serde(default)]
    pub migration: MigrationConfig,
    #[serde(default)]
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpotifyConfig {
    /// Already-authenticated OAuth access token. Prefer `SPOTIFY_ACCESS_TOKEN`.
    pub access_token: Option<String>,
    /// Playlist owner. Looked up from the token when unset.
    pub user_id: Option<String>,
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub search_limit: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationConfig {
    pub min_playlist_size: usize,
    pub batch_size: usize,
    pub tie_break: TieBreakKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: usize,
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
}

fn default_ignored_playlists() -> Vec<String> {
    DEFAULT_IGNORED_PLAYLISTS
        .iter()
        .map(|name| name.to_string())
        .collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            library: Some("~/Music/iTunes/iTunes Music Library.xml".to_string()),
            ignored_playlists: default_ignored_playlists(),
            spotify: SpotifyConfig::default(),
            migration: MigrationConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            user_id: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            search_limit: DEFAULT_SEARCH_LIMIT,
        }
    }
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            min_playlist_size: MIN_PLAYLIST_SIZE,
            batch_size: 100,
            tie_break: TieBreakKind::First,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            min_delay_ms: 500,
            max_delay_ms: 10_000,
        }
    }
}

impl SpotifyConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

impl Config {
    /// Load config from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .wrap_err_with(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Default config file location
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|path| path.join("playlist-migrator").join("config.toml"))
    }

    /// Load the config from its default location, falling back to defaults if it doesn't exist.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path().ok_or(eyre!("No config directory on this system"))?;

        if config_path.exists() {
            Self::from_file(&config_path)
        } else {
            log::debug!(
                "No config file at {}, using defaults",
                config_path.display()
            );
            Ok(Self::default())
        }
    }

    /// Write a default config file, if it doesn't exist. Returns its path.
    pub fn create_default() -> Result<PathBuf> {
        let config_path = Self::config_path().ok_or(eyre!("No config directory on this system"))?;
        Self::default().write_if_missing(&config_path)?;
        Ok(config_path)
    }

    fn write_if_missing(&self, path: &Path) -> Result<()> {
        if path.exists() {
            log::warn!("Config file already exists at {}", path.display());
            return Ok(());
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .wrap_err_with(|| format!("Failed to create {}", parent.display()))?;
        }
        let contents = toml::to_string_pretty(self).wrap_err("Failed to serialize config")?;
        std::fs::write(path, contents)
            .wrap_err_with(|| format!("Failed to write config file: {}", path.display()))?;
        log::info!("Wrote default config to {}", path.display());
        Ok(())
    }

    /// Expand ~ to home directory
    fn expand_path(&self, path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(rest);
            }
        }
        PathBuf::from(path)
    }

    /// Get expanded library path
    pub fn library_path(&self) -> Option<PathBuf> {
        self.library.as_deref().map(|path| self.expand_path(path))
    }

    pub fn ignored_playlists(&self) -> HashSet<String> {
        self.ignored_playlists.iter().cloned().collect()
    }

    /// Add names to ignore on top of the configured ones.
    pub fn ignore_playlists<I: IntoIterator<Item = String>>(&mut self, names: I) {
        self.ignored_playlists.extend(names);
    }
}
