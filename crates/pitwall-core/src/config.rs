//! Configuration management for pitwall.
//!
//! Loads configuration from ${PITWALL_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// A game server whose telemetry is relayed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub id: String,
    /// Display name until the server reports its own.
    pub name: String,
    /// Base URL of the server's web API.
    pub url: String,
}

/// Telegram bot configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Bot token for Telegram API.
    pub bot_token: Option<String>,
    /// Allowlist of numeric Telegram user IDs. Empty allows everyone.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowlist_user_ids: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: String,
    pub log_dir: Option<PathBuf>,
    pub language: String,
    pub fetch_timeout_secs: u64,
    pub settings_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub servers: Vec<ServerConfig>,
    pub telegram: TelegramConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Self::DEFAULT_LOG_LEVEL.to_string(),
            log_dir: None,
            language: Self::DEFAULT_LANGUAGE.to_string(),
            fetch_timeout_secs: Self::DEFAULT_FETCH_TIMEOUT_SECS,
            settings_path: None,
            servers: Vec::new(),
            telegram: TelegramConfig::default(),
        }
    }
}

pub mod paths {
    //! Path resolution for pitwall configuration and data.
    //!
    //! PITWALL_HOME resolution order:
    //! 1. PITWALL_HOME environment variable (if set)
    //! 2. ~/.config/pitwall (default)

    use std::path::PathBuf;

    pub fn pitwall_home() -> PathBuf {
        if let Ok(home) = std::env::var("PITWALL_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("pitwall")
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        pitwall_home().join("config.toml")
    }

    /// Returns the default path of the user settings store.
    pub fn settings_path() -> PathBuf {
        pitwall_home().join("settings.toml")
    }
}

/// Returns the default config template with comments.
fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

impl Config {
    const DEFAULT_LOG_LEVEL: &str = "info";
    const DEFAULT_LANGUAGE: &str = "en";
    const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 5;

    /// Loads configuration from the default config path.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Creates a default config file at the given path.
    /// Returns an error if the file already exists.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        fs::write(path, default_config_template())
            .with_context(|| format!("Failed to write config to {}", path.display()))
    }

    /// Bound on user-triggered fetches. Never zero.
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs.max(1))
    }

    pub fn settings_path(&self) -> PathBuf {
        self.settings_path
            .clone()
            .unwrap_or_else(paths::settings_path)
    }

    /// Resolves the bot token: config first, then environment.
    pub fn bot_token(&self) -> Option<String> {
        normalize(self.telegram.bot_token.as_deref())
            .or_else(|| normalize(std::env::var("PITWALL_TELEGRAM_BOT_TOKEN").ok().as_deref()))
            .or_else(|| normalize(std::env::var("TELEGRAM_BOT_TOKEN").ok().as_deref()))
    }
}

fn normalize(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
