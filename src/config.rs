//! Configuration for the breathing-effort server.

use crate::core::{EffortCalculator, ModeRegistry, WarmupRamp};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Main configuration for the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Length of the analysis window in seconds
    pub window_seconds: u32,

    /// BVP sampling rate in Hz
    pub sample_rate: u32,

    /// Calculator assigned to new sessions
    pub default_mode: String,

    /// Address the websocket server binds to
    pub bind_address: SocketAddr,

    /// Directory holding one sub-directory per recorded session
    pub save_path: PathBuf,

    /// Warm-up behaviour of new queues
    pub warmup: WarmupRamp,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("breathing-effort");

        Self {
            window_seconds: 15,
            sample_rate: 64,
            default_mode: EffortCalculator::AmplitudeModulation.name().to_string(),
            bind_address: SocketAddr::from(([0, 0, 0, 0], 5000)),
            save_path: data_dir.join("saved"),
            warmup: WarmupRamp::Half,
        }
    }
}

impl Config {
    /// Load configuration from the default location, falling back to
    /// defaults when no file exists.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a JSON file. Missing fields take defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Save configuration to the default location. Returns the path written.
    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        let config_path = Self::config_path();
        self.save_to(&config_path)?;
        Ok(config_path)
    }

    /// Write configuration as pretty-printed JSON, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("breathing-effort")
            .join("config.json")
    }

    /// Ensure the session save directory exists.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.save_path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        Ok(())
    }

    /// Number of samples held by a session window. Zero-length and
    /// unrepresentable windows are rejected.
    pub fn window_capacity(&self) -> Result<usize, ConfigError> {
        usize::try_from(self.window_seconds)
            .ok()
            .zip(usize::try_from(self.sample_rate).ok())
            .and_then(|(seconds, rate)| seconds.checked_mul(rate))
            .filter(|&capacity| capacity > 0)
            .ok_or_else(|| {
                ConfigError::Invalid(format!(
                    "window of {}s at {} Hz must hold between 1 and {} samples",
                    self.window_seconds,
                    self.sample_rate,
                    usize::MAX
                ))
            })
    }

    /// Resolve the default calculator against `registry`, checking the
    /// window size as well.
    pub fn validate(&self, registry: &ModeRegistry) -> Result<EffortCalculator, ConfigError> {
        self.window_capacity()?;

        registry
            .create(&self.default_mode)
            .ok_or_else(|| ConfigError::Invalid(format!("unknown mode: {}", self.default_mode)))
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
