use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
///
/// This gets loaded from the config file, then CLI flags override bits of it.
/// Priority: CLI > File > Defaults
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub worker: WorkerSettings,
}

impl Config {
    /// Load config from default location, defaults if it doesn't exist
    pub fn load() -> crate::Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load config from an explicit path, defaults if it doesn't exist
    pub fn load_from(path: &Path) -> crate::Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&contents)
                .map_err(|e| crate::Error::ConfigError(format!("Failed to parse config: {}", e)))?;
            Ok(config)
        } else {
            // No config file? Use defaults
            Ok(Self::default())
        }
    }

    /// Save config to the default location
    pub fn save(&self) -> crate::Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> crate::Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| crate::Error::ConfigError(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Config file path, XDG on Linux/macOS and AppData on Windows
    pub fn config_path() -> crate::Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| crate::Error::ConfigError("Could not find config directory".into()))?
            .join("dealcheck");

        Ok(config_dir.join("config.toml"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite file backing the product collections.
    /// Defaults to `<data_dir>/dealcheck/store.db`
    #[serde(default)]
    pub db_path: Option<PathBuf>,

    /// Free tier cap on monitored products
    #[serde(default = "default_free_limit")]
    pub free_limit: usize,
}

fn default_free_limit() -> usize {
    10
}

impl StorageConfig {
    /// Configured database path, falling back to the platform data dir
    pub fn resolved_db_path(&self) -> crate::Result<PathBuf> {
        if let Some(path) = &self.db_path {
            return Ok(path.clone());
        }

        let data_dir = dirs::data_dir()
            .ok_or_else(|| crate::Error::ConfigError("Could not find data directory".into()))?
            .join("dealcheck");

        Ok(data_dir.join("store.db"))
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            free_limit: default_free_limit(),
        }
    }
}

/// Offline worker knobs
///
/// Bumping `cache_version` renames both cache partitions, which is what makes
/// the next activation throw the old ones away.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerSettings {
    /// Origin the worker considers "same origin"
    #[serde(default = "default_origin")]
    pub origin: String,

    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Shell assets fetched at install time
    #[serde(default = "default_static_assets")]
    pub static_assets: Vec<String>,

    /// Page served when a document request can't reach the network
    #[serde(default = "default_offline_page")]
    pub offline_page: String,

    #[serde(default = "default_sync_tag")]
    pub sync_tag: String,
}

fn default_origin() -> String {
    "http://localhost:3000".to_string()
}

fn default_cache_version() -> String {
    "v1".to_string()
}

fn default_static_assets() -> Vec<String> {
    [
        "/",
        "/manifest.json",
        "/icon-192x192.png",
        "/icon-512x512.png",
        "/offline.html",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_offline_page() -> String {
    "/offline.html".to_string()
}

fn default_sync_tag() -> String {
    "background-sync-deals".to_string()
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            cache_version: default_cache_version(),
            static_assets: default_static_assets(),
            offline_page: default_offline_page(),
            sync_tag: default_sync_tag(),
        }
    }
}
