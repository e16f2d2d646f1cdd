//! Configuration management

use crate::poll::{PollConfig, DEFAULT_INTERVAL, DEFAULT_MAX_ATTEMPTS};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub polling: PollingConfig,
    pub preferences: PreferencesConfig,
}

/// Analysis-server connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL of the KinFin analysis server
    pub url: String,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8000".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Run-status polling settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Seconds between status checks
    pub interval_secs: u64,

    /// Status checks before a watch gives up
    pub max_attempts: u32,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_INTERVAL.as_secs(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl PollingConfig {
    pub fn to_poll_config(&self) -> PollConfig {
        PollConfig {
            interval: Duration::from_secs(self.interval_secs),
            max_attempts: self.max_attempts,
        }
    }
}

/// Persisted user preferences
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PreferencesConfig {
    /// Display theme; persisted for front ends, nothing in the CLI renders it
    pub theme: Theme,

    /// Session the CLI falls back to when no id is given on the command line.
    /// Library operations always take an explicit session id.
    pub current_session_id: Option<String>,

    /// Session-store snapshot directory override
    pub data_dir: Option<PathBuf>,
}

/// Display theme preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Config {
    /// Load config from file, or return defaults if not found
    pub fn load() -> Result<Self> {
        Self::load_from(Self::config_path())
    }

    /// Load config from a specific path, or return defaults if not found
    pub fn load_from(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if path.exists() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config at {}", path.display()))?;
            let config = toml::from_str(&content)
                .with_context(|| format!("invalid config at {}", path.display()))?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Write the config back to its default path
    pub fn save(&self) -> Result<()> {
        self.save_to(Self::config_path())
    }

    pub fn save_to(&self, path: impl Into<PathBuf>) -> Result<()> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)
            .with_context(|| format!("failed to write config at {}", path.display()))?;
        Ok(())
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("kinfin")
            .join("config.toml")
    }

    /// Directory holding persisted client state
    pub fn data_dir(&self) -> PathBuf {
        self.preferences
            .data_dir
            .clone()
            .or_else(dirs::data_dir)
            .unwrap_or_else(std::env::temp_dir)
            .join("kinfin")
    }

    /// Path of the session-store snapshot
    pub fn store_path(&self) -> PathBuf {
        self.data_dir().join("sessions.json")
    }
}
