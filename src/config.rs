//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub serial: SerialConfig,

    #[serde(default)]
    pub uplink: UplinkConfig,
}

/// Serial port configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    /// Device paths to try, in order of preference
    #[serde(default = "default_device_paths")]
    pub device_paths: Vec<String>,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
}

/// Uplink scheduling configuration
#[derive(Debug, Deserialize, Clone)]
pub struct UplinkConfig {
    /// Milliseconds between transmission opportunities
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Seconds between periodic status log lines
    #[serde(default = "default_status_log_interval_s")]
    pub status_log_interval_s: u64,
}

// Default value functions
fn default_device_paths() -> Vec<String> {
    vec!["/dev/ttyACM0".to_string(), "/dev/ttyUSB0".to_string()]
}
fn default_baud_rate() -> u32 { 420_000 }

fn default_interval_ms() -> u64 { 20 }
fn default_status_log_interval_s() -> u64 { 10 }

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            device_paths: default_device_paths(),
            baud_rate: default_baud_rate(),
        }
    }
}

impl Default for UplinkConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            status_log_interval_s: default_status_log_interval_s(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, TOML parsing fails, or
    /// validation fails.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to the defaults
    /// when the file does not exist.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.serial.device_paths.is_empty() {
            return Err(crate::error::TelemuxError::Config(
                toml::de::Error::custom("serial device_paths cannot be empty"),
            ));
        }

        if self.serial.baud_rate == 0 {
            return Err(crate::error::TelemuxError::Config(
                toml::de::Error::custom("baud_rate must be greater than 0"),
            ));
        }

        if self.uplink.interval_ms == 0 || self.uplink.interval_ms > 10_000 {
            return Err(crate::error::TelemuxError::Config(
                toml::de::Error::custom("interval_ms must be between 1 and 10000"),
            ));
        }

        if self.uplink.status_log_interval_s == 0 {
            return Err(crate::error::TelemuxError::Config(
                toml::de::Error::custom("status_log_interval_s must be greater than 0"),
            ));
        }

        Ok(())
    }
}
