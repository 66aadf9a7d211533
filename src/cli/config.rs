//! Configuration management for ollamachat
//!
//! Provides TOML-based configuration with defaults and validation.
//! Location: ~/.ollamachat/config.toml

use crate::errors::{ClientError, Result};
use crate::streaming::{Timeouts, DEFAULT_OLLAMA_URL};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Allowed sampling temperature range
pub const TEMPERATURE_RANGE: (f32, f32) = (0.0, 2.0);

/// Allowed max output token range
pub const MAX_TOKENS_RANGE: (u32, u32) = (100, 8000);

/// Complete configuration for ollamachat
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub ollama: OllamaConfig,
    pub generation: GenerationConfig,
    pub timeouts: TimeoutsConfig,
    pub paths: PathsConfig,
}

/// Ollama connection configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OllamaConfig {
    pub base_url: String,
    pub chat_model: String,
    pub demo_model: String,
}

/// Generation parameters for the chat front-end
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenerationConfig {
    pub temperature: f32,
    pub max_tokens: u32,
    pub num_ctx: u32,
    pub keep_alive: String,
    pub streaming: bool,
}

/// Network timeouts in seconds
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TimeoutsConfig {
    pub connect_secs: u64,
    pub request_secs: u64,
    pub status_secs: u64,
}

/// File system paths configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    pub export_dir: String,
    pub history_file: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OLLAMA_URL.to_string(),
            chat_model: "gpt-oss:20b".to_string(),
            demo_model: "tinyllama".to_string(),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 3000,
            num_ctx: 4096,
            keep_alive: "5m".to_string(),
            streaming: true,
        }
    }
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            connect_secs: 10,
            request_secs: 300,
            status_secs: 2,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            export_dir: ".".to_string(),
            history_file: "~/.ollamachat_history".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file or use defaults
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        if let Some(config_path) = path {
            Self::load_from_file(&config_path)
        } else {
            Self::load_default()
        }
    }

    /// Load configuration from specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ClientError::Config(format!("Failed to read config: {}", e)))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| ClientError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load default configuration from standard location or use built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Some(config_path) = Self::default_path() {
            if config_path.exists() {
                return Self::load_from_file(&config_path);
            }
        }

        Ok(Config::default())
    }

    /// Standard configuration file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".ollamachat").join("config.toml"))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let url = &self.ollama.base_url;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ClientError::Config(format!(
                "base_url must start with http:// or https://, got {}",
                url
            )));
        }

        validate_temperature(self.generation.temperature)?;
        validate_max_tokens(self.generation.max_tokens)?;

        if self.generation.num_ctx == 0 {
            return Err(ClientError::Config(
                "num_ctx must be greater than 0".to_string(),
            ));
        }

        if self.timeouts.connect_secs == 0
            || self.timeouts.request_secs == 0
            || self.timeouts.status_secs == 0
        {
            return Err(ClientError::Config(
                "timeouts must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Client timeouts
    pub fn client_timeouts(&self) -> Timeouts {
        Timeouts {
            connect: Duration::from_secs(self.timeouts.connect_secs),
            request: Duration::from_secs(self.timeouts.request_secs),
            status: Duration::from_secs(self.timeouts.status_secs),
        }
    }

    /// Expand tilde in paths
    pub fn expand_path(path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(rest);
            }
        }
        PathBuf::from(path)
    }

    /// Get export directory path
    pub fn export_dir(&self) -> PathBuf {
        Self::expand_path(&self.paths.export_dir)
    }

    /// Get REPL history file path
    pub fn history_file(&self) -> PathBuf {
        Self::expand_path(&self.paths.history_file)
    }
}

/// Check a temperature against the allowed range
pub fn validate_temperature(value: f32) -> Result<()> {
    let (min, max) = TEMPERATURE_RANGE;
    if !(min..=max).contains(&value) {
        return Err(ClientError::Config(format!(
            "temperature must be between {:.1} and {:.1}, got {}",
            min, max, value
        )));
    }
    Ok(())
}

/// Check a max token count against the allowed range
pub fn validate_max_tokens(value: u32) -> Result<()> {
    let (min, max) = MAX_TOKENS_RANGE;
    if !(min..=max).contains(&value) {
        return Err(ClientError::Config(format!(
            "max_tokens must be between {} and {}, got {}",
            min, max, value
        )));
    }
    Ok(())
}
