use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::version::modrinth::DEFAULT_BASE_URL;

// =============================================================================
// Fetch-related constants
// =============================================================================

/// Number of ids sent in one batch request
pub const DEFAULT_SEGMENT_SIZE: usize = 50;

/// Maximum number of batch requests in flight at once
pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 20;

/// Total timeout for one batch request in milliseconds (10 seconds)
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

/// Connect timeout for one batch request in milliseconds (5 seconds)
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5_000;

/// Number of projects allowed to miss a loader/game-version combination
pub const DEFAULT_ACCEPTABLE_FAIL_COUNT: usize = 0;

/// Application configuration structure
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct AppConfig {
    pub catalog: CatalogConfig,
    pub compat: CompatConfig,
    pub cache: CacheConfig,
}

/// Upstream catalog configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct CatalogConfig {
    pub base_url: String,
    /// Ids per outbound batch request
    pub segment_size: usize,
    pub max_concurrent_requests: usize,
    /// Per-request timeout in milliseconds
    pub request_timeout: u64,
    /// Connect timeout in milliseconds
    pub connect_timeout: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            segment_size: DEFAULT_SEGMENT_SIZE,
            max_concurrent_requests: DEFAULT_MAX_CONCURRENT_REQUESTS,
            request_timeout: DEFAULT_REQUEST_TIMEOUT_MS,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT_MS,
        }
    }
}

/// Compatibility matrix configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct CompatConfig {
    pub acceptable_fail_count: usize,
}

impl Default for CompatConfig {
    fn default() -> Self {
        Self {
            acceptable_fail_count: DEFAULT_ACCEPTABLE_FAIL_COUNT,
        }
    }
}

/// Version cache configuration
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct CacheConfig {
    /// Database file; defaults to [`db_path`]
    pub db_path: Option<PathBuf>,
}

impl AppConfig {
    /// Load configuration from a JSON file; missing fields use defaults
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Database path honoring the configured override
    pub fn db_path(&self) -> PathBuf {
        self.cache.db_path.clone().unwrap_or_else(db_path)
    }
}

/// Returns the path to the data directory for modrinth-compat.
/// Uses $XDG_DATA_HOME/modrinth-compat if XDG_DATA_HOME is set,
/// otherwise falls back to ~/.local/share/modrinth-compat,
/// or ./modrinth-compat if neither is available.
pub fn data_dir() -> PathBuf {
    data_dir_with_env(std::env::var("XDG_DATA_HOME").ok(), dirs::home_dir())
}

/// Returns the path to the database file.
pub fn db_path() -> PathBuf {
    data_dir().join("modrinth.db")
}

fn data_dir_with_env(xdg_data_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let data_dir = xdg_data_home
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));

    data_dir.join("modrinth-compat")
}
