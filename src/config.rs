//! Configuration management for PSVR2 Triggers
//!
//! Handles loading, validation, and saving of the JSON configuration file.
//! Configuration is stored at `~/.config/psvr2-triggers/config.json`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::effects::EffectTable;

// ============================================================================
// Constants
// ============================================================================

/// Default config directory name
const CONFIG_DIR: &str = "psvr2-triggers";

/// Default config file name
const CONFIG_FILE: &str = "config.json";

/// Default pause between the reset and the new effect (milliseconds)
const DEFAULT_SETTLE_DELAY_MS: u64 = 5;

/// Upper bound for the settle pause (milliseconds)
const MAX_SETTLE_DELAY_MS: u64 = 250;

/// Default tick rate, one poll per headset frame
const DEFAULT_TICK_RATE_HZ: u32 = 90;

/// Tick rate bounds
const MIN_TICK_RATE_HZ: u32 = 1;
const MAX_TICK_RATE_HZ: u32 = 1000;

/// Lower bound for the reconnect cooldown (milliseconds)
const MIN_RECONNECT_COOLDOWN_MS: u64 = 100;

// ============================================================================
// Trigger Configuration
// ============================================================================

/// Trigger session settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerConfig {
    /// Enable trigger effects
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Pause after the reset command before sending the new effect
    #[serde(default = "default_settle_delay")]
    pub settle_delay_ms: u64,

    /// How often the world state is polled
    #[serde(default = "default_tick_rate")]
    pub tick_rate_hz: u32,

    /// Retry a failed connection after this many milliseconds
    /// (None = stay degraded until restart)
    #[serde(default)]
    pub reconnect_cooldown_ms: Option<u64>,
}

fn default_true() -> bool { true }
fn default_settle_delay() -> u64 { DEFAULT_SETTLE_DELAY_MS }
fn default_tick_rate() -> u32 { DEFAULT_TICK_RATE_HZ }

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            tick_rate_hz: DEFAULT_TICK_RATE_HZ,
            reconnect_cooldown_ms: None,
        }
    }
}

impl TriggerConfig {
    /// Validate and clamp all values
    pub fn validate(&mut self) {
        self.settle_delay_ms = self.settle_delay_ms.min(MAX_SETTLE_DELAY_MS);
        self.tick_rate_hz = self.tick_rate_hz.clamp(MIN_TICK_RATE_HZ, MAX_TICK_RATE_HZ);
        self.reconnect_cooldown_ms = self
            .reconnect_cooldown_ms
            .map(|ms| ms.max(MIN_RECONNECT_COOLDOWN_MS));
    }

    /// Settle pause as a duration
    pub fn settle_delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.settle_delay_ms)
    }

    /// Time between ticks
    pub fn tick_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(1) / self.tick_rate_hz.max(MIN_TICK_RATE_HZ)
    }

    /// Reconnect cooldown, if reconnection is enabled
    pub fn reconnect_cooldown(&self) -> Option<std::time::Duration> {
        self.reconnect_cooldown_ms.map(std::time::Duration::from_millis)
    }
}

// ============================================================================
// Main Configuration
// ============================================================================

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Trigger session settings
    #[serde(default)]
    pub triggers: TriggerConfig,

    /// Weapon type to effect table
    #[serde(default)]
    pub effects: EffectTable,

    /// Configuration file path (not serialized)
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            triggers: TriggerConfig::default(),
            effects: EffectTable::default(),
            config_path: None,
        }
    }
}

impl Config {
    /// Get the default config directory path
    pub fn default_config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join(CONFIG_DIR))
    }

    /// Get the default config file path
    pub fn default_config_path() -> Option<PathBuf> {
        Self::default_config_dir().map(|p| p.join(CONFIG_FILE))
    }

    /// Load configuration from the default location
    ///
    /// Returns default config if file doesn't exist.
    pub fn load_default() -> Result<Self, ConfigError> {
        match Self::default_config_path() {
            Some(path) => Self::load(&path),
            None => {
                tracing::warn!("Could not determine config directory, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load configuration from file path
    ///
    /// Returns default config if file doesn't exist.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::info!(path = %path.display(), "Config file not found, using defaults");
            let mut config = Self::default();
            config.config_path = Some(path.to_path_buf());
            return Ok(config);
        }

        let contents = fs::read_to_string(path).map_err(ConfigError::IoError)?;
        let mut config = Self::from_json(&contents)?;
        config.config_path = Some(path.to_path_buf());

        tracing::info!(
            path = %path.display(),
            enabled = config.triggers.enabled,
            tick_rate_hz = config.triggers.tick_rate_hz,
            settle_delay_ms = config.triggers.settle_delay_ms,
            weapon_types = config.effects.entries.len(),
            "Configuration loaded"
        );

        Ok(config)
    }

    /// Parse and validate configuration from a JSON string
    pub fn from_json(contents: &str) -> Result<Self, ConfigError> {
        let mut config: Config =
            serde_json::from_str(contents).map_err(ConfigError::ParseError)?;
        config.validate();
        Ok(config)
    }

    /// Validate and clamp values
    pub fn validate(&mut self) {
        self.triggers.validate();
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = match &self.config_path {
            Some(p) => p.clone(),
            None => Self::default_config_path()
                .ok_or_else(|| ConfigError::ValidationError("No config path".to_string()))?,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(ConfigError::IoError)?;
        }

        let contents = self.to_json()?;
        fs::write(&path, contents).map_err(ConfigError::IoError)?;

        tracing::info!(path = %path.display(), "Configuration saved");
        Ok(())
    }

    /// Serialize as pretty JSON
    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(ConfigError::ParseError)
    }

    /// Path this config was loaded from, or the default path
    pub fn path(&self) -> Option<PathBuf> {
        self.config_path.clone().or_else(Self::default_config_path)
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Configuration error type
#[derive(Debug)]
pub enum ConfigError {
    /// I/O error reading/writing file
    IoError(std::io::Error),
    /// JSON parsing error
    ParseError(serde_json::Error),
    /// Validation error
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "I/O error: {}", e),
            ConfigError::ParseError(e) => write!(f, "Parse error: {}", e),
            ConfigError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::IoError(e) => Some(e),
            ConfigError::ParseError(e) => Some(e),
            ConfigError::ValidationError(_) => None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
