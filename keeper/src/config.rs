//! Keeper configuration

use anyhow::{Context, Result};
use ptsol_pool::EngineConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Used when `KEEPER_CONFIG` is unset
pub const DEFAULT_CONFIG_PATH: &str = "keeper-config.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Where the ledger and scheduler state are persisted between runs
    pub snapshot_path: String,

    /// Polling interval in seconds
    pub poll_interval_secs: u64,

    /// Maximum deliveries per tick
    pub max_tasks_per_tick: usize,

    /// Engine parameters, shared with every instruction the keeper dispatches
    #[serde(default)]
    pub engine: EngineConfig,
}

impl Config {
    /// Load configuration from the TOML file named by `KEEPER_CONFIG`
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("KEEPER_CONFIG")
            .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(&config_path)
    }

    pub fn load_from(path: &str) -> Result<Self> {
        let expanded = shellexpand::tilde(path);
        let config_str = std::fs::read_to_string(expanded.as_ref())
            .context(format!("Failed to read config file: {}", path))?;

        let config: Config = toml::from_str(&config_str)
            .context("Failed to parse config TOML")?;

        config
            .engine
            .validate()
            .context("Invalid engine section")?;
        if config.poll_interval_secs == 0 {
            anyhow::bail!("poll_interval_secs must be at least 1");
        }

        Ok(config)
    }

    /// Local single-node defaults
    pub fn default_localnet() -> Self {
        Self {
            snapshot_path: "~/.config/ptsol/keeper-snapshot.json".to_string(),
            poll_interval_secs: 1,
            max_tasks_per_tick: 16,
            engine: EngineConfig::default(),
        }
    }

    /// Snapshot path with `~` expanded
    pub fn snapshot_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.snapshot_path).into_owned())
    }

    /// Write default config to file
    pub fn write_default(path: &str) -> Result<()> {
        let config = Self::default_localnet();
        let toml_str = toml::to_string_pretty(&config)
            .context("Failed to serialize config")?;

        let expanded = shellexpand::tilde(path);
        std::fs::write(expanded.as_ref(), toml_str)
            .context(format!("Failed to write config to {}", path))?;

        log::info!("Created default config at {}", path);
        Ok(())
    }
}
