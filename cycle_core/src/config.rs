//! Configuration file support for cyclecal.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/cyclecal/config.toml`.

use crate::forecast::{ForecastPolicy, DEFAULT_LUTEAL_PHASE_DAYS, FORECAST_CYCLE_COUNT};
use crate::stats::DEFAULT_HISTORY_WINDOW;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub forecast: ForecastConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Forecast policy parameters
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ForecastConfig {
    #[serde(default = "default_luteal_phase_days")]
    pub luteal_phase_days: u32,

    #[serde(default = "default_fertile_days_before")]
    pub fertile_days_before: u32,

    #[serde(default = "default_fertile_days_after")]
    pub fertile_days_after: u32,

    #[serde(default = "default_min_cycles")]
    pub min_cycles: u32,

    #[serde(default = "default_history_window")]
    pub history_window: usize,

    #[serde(default = "default_clamp_ovulation")]
    pub clamp_ovulation: bool,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            luteal_phase_days: default_luteal_phase_days(),
            fertile_days_before: default_fertile_days_before(),
            fertile_days_after: default_fertile_days_after(),
            min_cycles: default_min_cycles(),
            history_window: default_history_window(),
            clamp_ovulation: default_clamp_ovulation(),
        }
    }
}

impl ForecastConfig {
    /// Validated forecast policy
    pub fn policy(&self) -> Result<ForecastPolicy> {
        let policy = ForecastPolicy {
            luteal_phase_days: self.luteal_phase_days,
            fertile_days_before: self.fertile_days_before,
            fertile_days_after: self.fertile_days_after,
            min_cycles: self.min_cycles,
            history_window: self.history_window,
            clamp_ovulation: self.clamp_ovulation,
        };
        policy.validate()?;
        Ok(policy)
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));
    base.join("cyclecal")
}

fn default_luteal_phase_days() -> u32 {
    DEFAULT_LUTEAL_PHASE_DAYS
}

fn default_fertile_days_before() -> u32 {
    5
}

fn default_fertile_days_after() -> u32 {
    1
}

fn default_min_cycles() -> u32 {
    FORECAST_CYCLE_COUNT
}

fn default_history_window() -> usize {
    DEFAULT_HISTORY_WINDOW
}

fn default_clamp_ovulation() -> bool {
    true
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.forecast.policy()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."));
        base.join("cyclecal").join("config.toml")
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}
