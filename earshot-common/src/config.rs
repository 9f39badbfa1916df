//! Configuration loading and storage root resolution
//!
//! Bootstrap settings come from a small TOML file. Storage roots are resolved in
//! priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. OS-dependent default (fallback)

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the documents root
pub const DOCUMENTS_ENV: &str = "EARSHOT_DOCUMENTS";

/// Environment variable overriding the cache root
pub const CACHE_ENV: &str = "EARSHOT_CACHE";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    /// Root for persisted user data (recents, library, statistics)
    #[serde(default)]
    pub documents_dir: Option<PathBuf>,

    /// Root for disposable data
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    /// Root that `Anchor::Root` directories resolve against (default "/")
    #[serde(default)]
    pub filesystem_root: Option<PathBuf>,

    #[serde(default)]
    pub player: PlayerSection,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// `[player]` table
#[derive(Debug, Clone, Deserialize)]
pub struct PlayerSection {
    /// Seek forward/backward increment
    #[serde(default = "default_skip_interval_secs")]
    pub skip_interval_secs: u64,

    /// Period of the position/rate refresh tick
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Number of items kept in the recents list
    #[serde(default = "default_recents_capacity")]
    pub recents_capacity: usize,

    /// Timeout for probing a stream URL
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
}

impl Default for PlayerSection {
    fn default() -> Self {
        Self {
            skip_interval_secs: default_skip_interval_secs(),
            tick_interval_ms: default_tick_interval_ms(),
            recents_capacity: default_recents_capacity(),
            probe_timeout_secs: default_probe_timeout_secs(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_skip_interval_secs() -> u64 {
    15
}

fn default_tick_interval_ms() -> u64 {
    500
}

fn default_recents_capacity() -> usize {
    3
}

fn default_probe_timeout_secs() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Load and parse a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        let config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load an explicit config file, or the platform default if present
    ///
    /// An explicit path must exist. A missing default file falls back to built-in
    /// defaults with a warning; a malformed one is still an error.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        match default_config_path() {
            Some(path) => Self::load(&path),
            None => {
                warn!("No config file found, using built-in defaults");
                Ok(Self::default())
            }
        }
    }
}

/// Locate the default configuration file for the platform
pub fn default_config_path() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("earshot").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/earshot/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Absolute locations of the three base anchors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageRoots {
    pub documents: PathBuf,
    pub cache: PathBuf,
    pub filesystem: PathBuf,
}

impl StorageRoots {
    /// Resolve all roots from CLI override, environment, config and defaults
    pub fn resolve(cli_documents: Option<&Path>, config: &TomlConfig) -> Self {
        let documents = cli_documents
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(DOCUMENTS_ENV).map(PathBuf::from))
            .or_else(|| config.documents_dir.clone())
            .unwrap_or_else(default_documents_dir);

        let cache = std::env::var_os(CACHE_ENV)
            .map(PathBuf::from)
            .or_else(|| config.cache_dir.clone())
            .unwrap_or_else(default_cache_dir);

        let filesystem = config
            .filesystem_root
            .clone()
            .unwrap_or_else(|| PathBuf::from("/"));

        Self {
            documents,
            cache,
            filesystem,
        }
    }

    /// Roots laid out beneath a single base directory
    pub fn under(base: &Path) -> Self {
        Self {
            documents: base.join("Documents"),
            cache: base.join("Caches"),
            filesystem: base.to_path_buf(),
        }
    }
}

fn default_documents_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("earshot").join("Documents"))
        .unwrap_or_else(|| PathBuf::from("./earshot_data/Documents"))
}

fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .map(|d| d.join("earshot"))
        .unwrap_or_else(|| PathBuf::from("./earshot_data/Caches"))
}
