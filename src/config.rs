//! # Configuration Module
//!
//! Handles loading and validating serial link configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{BridgeError, Result};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub serial: SerialConfig,
}

/// Serial port configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct SerialConfig {
    #[serde(default = "default_serial_port")]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_data_bits")]
    pub data_bits: u8,

    #[serde(default)]
    pub parity: Parity,

    #[serde(default)]
    pub stop_bits: StopBits,

    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
}

/// Parity setting, written as in `8N1`
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum Parity {
    #[default]
    #[serde(rename = "N")]
    None,
    #[serde(rename = "E")]
    Even,
    #[serde(rename = "O")]
    Odd,
    #[serde(rename = "M")]
    Mark,
    #[serde(rename = "S")]
    Space,
}

/// Stop bits setting
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopBits {
    #[default]
    #[serde(rename = "1")]
    One,
    #[serde(rename = "1.5")]
    OnePointFive,
    #[serde(rename = "2")]
    Two,
}

impl FromStr for Parity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "N" => Ok(Parity::None),
            "E" => Ok(Parity::Even),
            "O" => Ok(Parity::Odd),
            "M" => Ok(Parity::Mark),
            "S" => Ok(Parity::Space),
            _ => Err(format!("unknown parity: {} (expected one of N, E, O, M, S)", s)),
        }
    }
}

impl fmt::Display for Parity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Parity::None => "N",
            Parity::Even => "E",
            Parity::Odd => "O",
            Parity::Mark => "M",
            Parity::Space => "S",
        };
        f.write_str(s)
    }
}

impl FromStr for StopBits {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "1" => Ok(StopBits::One),
            "1.5" => Ok(StopBits::OnePointFive),
            "2" => Ok(StopBits::Two),
            _ => Err(format!("unknown stop bits: {} (expected one of 1, 1.5, 2)", s)),
        }
    }
}

impl fmt::Display for StopBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StopBits::One => "1",
            StopBits::OnePointFive => "1.5",
            StopBits::Two => "2",
        };
        f.write_str(s)
    }
}

// Default value functions
fn default_serial_port() -> String { "/dev/ttyUSB0".to_string() }
fn default_baud_rate() -> u32 { 19200 }
fn default_data_bits() -> u8 { 8 }
fn default_read_timeout_ms() -> u64 { 5000 }

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_serial_port(),
            baud_rate: default_baud_rate(),
            data_bits: default_data_bits(),
            parity: Parity::default(),
            stop_bits: StopBits::default(),
            read_timeout_ms: default_read_timeout_ms(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use rs232_i2c::config::Config;
    ///
    /// let config = Config::load("config/bridge.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.serial.validate()?;
        Ok(config)
    }
}

impl SerialConfig {
    /// Per-read timeout as a `Duration`
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if self.port.is_empty() {
            return Err(BridgeError::Config(
                toml::de::Error::custom("serial port cannot be empty")
            ));
        }

        if self.baud_rate == 0 {
            return Err(BridgeError::Config(
                toml::de::Error::custom("baud_rate must be greater than 0")
            ));
        }

        if !(5..=8).contains(&self.data_bits) {
            return Err(BridgeError::Config(
                toml::de::Error::custom("data_bits must be between 5 and 8")
            ));
        }

        if self.read_timeout_ms == 0 {
            return Err(BridgeError::Config(
                toml::de::Error::custom("read_timeout_ms must be greater than 0")
            ));
        }

        Ok(())
    }
}
