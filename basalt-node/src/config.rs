//! basalt-node configuration
//!
//! Settings come from an optional TOML file, with CLI/env overrides applied
//! in `main.rs` (flag > env > file > default).

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::info;

use crate::error::{Error, Result};

/// Node configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP listen port
    pub port: u16,

    /// Filter names that must never appear in an accepted filter spec
    pub disabled_filters: Vec<String>,

    /// Bound on a single track resolution, in milliseconds
    pub resolve_timeout_ms: u64,

    /// Bound on a single voice connection attempt, in milliseconds
    pub connect_timeout_ms: u64,

    /// Interval between periodic player-update emissions while playing
    pub player_update_interval_ms: u64,

    /// Granularity of the playback position clock
    pub position_tick_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 7700,
            disabled_filters: Vec::new(),
            resolve_timeout_ms: 10_000,
            connect_timeout_ms: 10_000,
            player_update_interval_ms: 5_000,
            position_tick_ms: 250,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, or defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Config> {
        match path {
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(|e| {
                    Error::Config(format!("failed to read {}: {}", path.display(), e))
                })?;
                let config: Config = toml::from_str(&content).map_err(|e| {
                    Error::Config(format!("failed to parse {}: {}", path.display(), e))
                })?;
                info!("Loaded configuration from {}", path.display());
                Ok(config)
            }
            None => Ok(Config::default()),
        }
    }

    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_millis(self.resolve_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn player_update_interval(&self) -> Duration {
        Duration::from_millis(self.player_update_interval_ms)
    }

    pub fn position_tick(&self) -> Duration {
        Duration::from_millis(self.position_tick_ms.max(10))
    }
}
