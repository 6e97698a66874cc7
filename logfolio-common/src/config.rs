//! Configuration management for Logfolio.
//!
//! The service reads a single configuration file at `~/.logfolio/config.json`.
//!
//! # Configuration Priority
//!
//! 1. Environment variables (LOGFOLIO_* prefix)
//! 2. Explicit config file values
//! 3. Default values
//!
//! # Environment Variable Mapping
//!
//! - `LOGFOLIO_HOST` → network.bind
//! - `LOGFOLIO_PORT` → network.port
//! - `LOGFOLIO_DB_PATH` → storage.db_path
//! - `LOGFOLIO_LOG_LEVEL` → observability.log_level
//! - `LOGFOLIO_LOG_FORMAT` → observability.log_format
//! - `LOGFOLIO_BLUR_CURRENCY` → display.blur_currency

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default HTTP port for the Logfolio service.
pub const DEFAULT_PORT: u16 = 4460;

/// Default quiet period before an autosave fires.
pub const DEFAULT_DEBOUNCE_MS: u64 = 2000;

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".logfolio"),
        |dirs| dirs.home_dir().join(".logfolio"),
    )
}

/// Get the configuration file path.
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

// ============================================================================
// Network Configuration
// ============================================================================

/// Network configuration for the HTTP service.
///
/// Default bind is `127.0.0.1` (local only).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_bind_address")]
    pub bind: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Allow cross-origin requests from any origin (for a separately served UI).
    #[serde(default = "default_true")]
    pub cors_allow_any: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind: default_bind_address(),
            port: default_port(),
            cors_allow_any: true,
        }
    }
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

// ============================================================================
// Storage Configuration
// ============================================================================

/// SQLite storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    /// Database file. Defaults to `<config_dir>/logfolio.db`.
    #[serde(default)]
    pub db_path: Option<PathBuf>,
}

// ============================================================================
// Observability Configuration
// ============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level", alias = "level")]
    pub log_level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format", alias = "format")]
    pub log_format: String,

    /// Additional module targets clamped to `warn`.
    #[serde(default)]
    pub excluded_targets: Vec<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
            excluded_targets: Vec::new(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

// ============================================================================
// Display Configuration
// ============================================================================

/// Rendering preferences passed explicitly to report/portfolio formatting.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct DisplayConfig {
    /// Mask currency amounts (e.g. when sharing a screen).
    #[serde(default)]
    pub blur_currency: bool,
}

// ============================================================================
// Autosave Configuration
// ============================================================================

/// Debounced autosave settings for journal and canvas edits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutosaveConfig {
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}

fn default_true() -> bool {
    true
}

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// JSON Schema reference
    #[serde(rename = "$schema", default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub display: DisplayConfig,

    #[serde(default)]
    pub autosave: AutosaveConfig,
}

impl Config {
    /// Load configuration from the default path.
    pub fn load() -> Result<Self> {
        let path = config_path();
        if !path.exists() {
            tracing::info!("Config file not found, using defaults");
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Load configuration with environment variable overrides.
    pub fn load_with_env() -> Result<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable lookup.
    ///
    /// Unparseable values are ignored and the existing setting kept.
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(bind) = lookup("LOGFOLIO_HOST") {
            self.network.bind = bind;
        }
        if let Some(port) = lookup("LOGFOLIO_PORT") {
            match port.parse() {
                Ok(p) => self.network.port = p,
                Err(_) => tracing::warn!(value = %port, "Ignoring invalid LOGFOLIO_PORT"),
            }
        }
        if let Some(path) = lookup("LOGFOLIO_DB_PATH") {
            self.storage.db_path = Some(PathBuf::from(path));
        }
        if let Some(level) = lookup("LOGFOLIO_LOG_LEVEL") {
            self.observability.log_level = level;
        }
        if let Some(format) = lookup("LOGFOLIO_LOG_FORMAT") {
            self.observability.log_format = format;
        }
        if let Some(blur) = lookup("LOGFOLIO_BLUR_CURRENCY") {
            self.display.blur_currency = matches!(blur.as_str(), "1" | "true" | "yes");
        }
    }

    /// Save configuration to the default path.
    pub fn save(&self) -> Result<()> {
        self.save_to(&config_path())
    }

    /// Save configuration to a specific path, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                fs::create_dir_all(dir).with_context(|| {
                    format!("Failed to create config directory {}", dir.display())
                })?;
            }
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config to {}", path.display()))
    }

    /// Get the effective bind address.
    pub fn bind_address(&self) -> &str {
        &self.network.bind
    }

    /// Get the effective HTTP port.
    pub fn port(&self) -> u16 {
        self.network.port
    }

    /// Get the effective database path.
    pub fn db_path(&self) -> PathBuf {
        self.storage
            .db_path
            .clone()
            .unwrap_or_else(|| config_dir().join("logfolio.db"))
    }

    /// Get the service endpoint URL.
    pub fn endpoint(&self) -> String {
        format!("http://{}:{}", self.bind_address(), self.port())
    }
}
