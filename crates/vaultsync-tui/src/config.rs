//! Configuration file handling.
//!
//! Reads from `~/.config/vaultsync/vaultsync.toml`

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use vaultsync_core::{SeedVault, SyncSettings};

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Seed vault loaded into the in-memory backend. The built-in demo vault
    /// is used when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed_path: Option<PathBuf>,
    /// Simulated latency of every backend call, in milliseconds.
    #[serde(default = "default_latency_ms")]
    pub latency_ms: u64,
    /// Timing of the synchronization engine.
    #[serde(default)]
    pub sync: SyncSettings,
}

fn default_latency_ms() -> u64 {
    120
}

impl Default for Config {
    fn default() -> Self {
        Self {
            seed_path: None,
            latency_ms: default_latency_ms(),
            sync: SyncSettings::default(),
        }
    }
}

impl Config {
    /// Load configuration from the config file.
    ///
    /// If `custom_path` is provided, load from that path.
    /// Otherwise, load from the default XDG config location.
    /// Creates a default config file if it doesn't exist (only for default path).
    pub fn load(custom_path: Option<PathBuf>) -> Result<Self> {
        match custom_path {
            Some(path) => {
                if !path.exists() {
                    anyhow::bail!("Config file not found: {}", path.display());
                }
                Self::read(&path)
            }
            None => {
                let path = Self::config_path()?;
                if path.exists() {
                    Self::read(&path)
                } else {
                    let config = Config::default();
                    config.save_to(&path)?;
                    tracing::info!("Created default config at {}", path.display());
                    Ok(config)
                }
            }
        }
    }

    fn read(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        tracing::info!("Loaded config from {}: {:?}", path.display(), config);
        Ok(config)
    }

    /// Write configuration to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }

    /// Read the configured seed vault, or the demo vault when none is set.
    pub fn load_seed(&self) -> Result<SeedVault> {
        let Some(path) = &self.seed_path else {
            return Ok(SeedVault::demo());
        };
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read seed file: {}", path.display()))?;
        SeedVault::from_toml(&contents)
            .with_context(|| format!("Failed to parse seed file: {}", path.display()))
    }

    /// Get the path to the config file.
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Could not determine config directory")?;

        Ok(config_dir.join("vaultsync").join("vaultsync.toml"))
    }
}
