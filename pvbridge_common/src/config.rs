//! Configuration loading traits and types.
//!
//! Every TOML file of the workspace is loaded through the blanket
//! [`ConfigLoader`] trait.
//!
//! # Usage
//!
//! ```rust,no_run
//! use pvbridge_common::config::{BridgeConfig, ConfigError, ConfigLoader, SharedConfig};
//! use serde::Deserialize;
//! use std::path::Path;
//!
//! #[derive(Debug, Deserialize)]
//! struct MyAppConfig {
//!     shared: SharedConfig,
//!     cycle: BridgeConfig,
//! }
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = MyAppConfig::load(Path::new("config.toml"))?;
//!     config.cycle.validate()?;
//!     println!("Service: {}", config.shared.service_name);
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::consts::{DEFAULT_CYCLE_TIME_MS, MIN_CYCLE_TIME_MS};

/// Error type for configuration loading operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Log level for application logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

/// Common configuration fields.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "pvbridge-01"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
    /// Logging verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Application instance identifier.
    pub service_name: String,
}

impl SharedConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if `service_name` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_cycletime_ms() -> u64 {
    DEFAULT_CYCLE_TIME_MS
}

/// Engine initialization parameters.
///
/// # TOML Example
///
/// ```toml
/// [cycle]
/// cycletime_ms = 50
/// debug = true
/// auto_prefix = true
/// cleanup = true
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BridgeConfig {
    /// Cycle period in milliseconds.
    #[serde(default = "default_cycletime_ms")]
    pub cycletime_ms: u64,

    /// Log overruns and per-binding detail.
    #[serde(default)]
    pub debug: bool,

    /// Prefix exposed names with the point's logical module name.
    #[serde(default)]
    pub auto_prefix: bool,

    /// Reset outputs to their default value when the loop stops.
    #[serde(default)]
    pub cleanup: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            cycletime_ms: DEFAULT_CYCLE_TIME_MS,
            debug: false,
            auto_prefix: false,
            cleanup: false,
        }
    }
}

impl BridgeConfig {
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if `cycletime_ms` is below
    /// [`MIN_CYCLE_TIME_MS`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cycletime_ms < MIN_CYCLE_TIME_MS {
            return Err(ConfigError::ValidationError(format!(
                "cycletime_ms must be at least {MIN_CYCLE_TIME_MS}, got {}",
                self.cycletime_ms
            )));
        }
        Ok(())
    }

    #[inline]
    pub fn cycle_time(&self) -> Duration {
        Duration::from_millis(self.cycletime_ms)
    }
}

/// Trait for loading configuration from TOML files.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid
///
/// Semantic validation is left to the caller.
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}
