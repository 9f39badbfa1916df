//! earshot-player runtime configuration
//!
//! Derived from the `[player]` table of the bootstrap TOML file.

use earshot_common::config::TomlConfig;
use std::time::Duration;

/// Playback engine settings
#[derive(Debug, Clone)]
pub struct PlayerConfig {
    /// Seek forward/backward increment
    pub skip_interval: Duration,
    /// Period of the position/rate refresh tick
    pub tick_interval: Duration,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            skip_interval: Duration::from_secs(15),
            tick_interval: Duration::from_millis(500),
        }
    }
}

impl From<&TomlConfig> for PlayerConfig {
    fn from(config: &TomlConfig) -> Self {
        Self {
            skip_interval: Duration::from_secs(config.player.skip_interval_secs),
            // Guard against a zero period, which tokio's interval rejects
            tick_interval: Duration::from_millis(config.player.tick_interval_ms.max(10)),
        }
    }
}

/// Recents/statistics tracker settings
#[derive(Debug, Clone)]
pub struct StatisticsConfig {
    /// Maximum length of the recents list
    pub capacity: usize,
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self { capacity: 3 }
    }
}

impl From<&TomlConfig> for StatisticsConfig {
    fn from(config: &TomlConfig) -> Self {
        Self {
            capacity: config.player.recents_capacity,
        }
    }
}
