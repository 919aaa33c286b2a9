//! System configuration parameters
//!
//! All tunable parameters for the pump supervisor. Loaded once at startup
//! from a YAML file (see [`crate::adapters::config_file`]); every section
//! and field falls back to a fixed default when absent.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;
use crate::safety::SafetyEnvelope;

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    pub pump: PumpConfig,
    pub temperature: TemperatureConfig,
    pub logging: LoggingConfig,
}

/// Relay / duty-cycle parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PumpConfig {
    /// Length of one duty cycle (seconds)
    pub run_time: u64,
    /// BCM GPIO number driving the relay
    pub gpio_pin: u32,
    /// Relay board energizes on a low line level
    pub active_low: bool,
}

impl Default for PumpConfig {
    fn default() -> Self {
        Self {
            run_time: 600,
            gpio_pin: 17,
            active_low: false,
        }
    }
}

/// Safety envelope and sampling cadence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemperatureConfig {
    /// Below this (Celsius) a cycle must not start
    pub min: f32,
    /// Above this (Celsius) the pump is stopped immediately
    pub max: f32,
    /// Above this (Celsius) a warning is logged
    pub warning: f32,
    /// Seconds between monitoring checks
    pub check_interval: u64,
    /// BCM GPIO number of the 1-Wire data line (informational; the kernel
    /// overlay owns the pin)
    pub gpio_pin: u32,
}

impl Default for TemperatureConfig {
    fn default() -> Self {
        Self {
            min: 15.0,
            max: 30.0,
            warning: 25.0,
            check_interval: 30,
            gpio_pin: 4,
        }
    }
}

/// Log sink parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Append-only log file
    pub pump_log: PathBuf,
    /// Level name (`DEBUG`, `INFO`, `WARNING`, `ERROR`), case-insensitive
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            pump_log: PathBuf::from("logs/fermentation.log"),
            level: "INFO".to_string(),
        }
    }
}

impl SystemConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_yaml::from_str(text).map_err(|e| ConfigError::Malformed(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that would make the safety classification
    /// inconsistent or the duty cycle degenerate.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.temperature;
        if !(t.min.is_finite() && t.max.is_finite() && t.warning.is_finite()) {
            return Err(ConfigError::ValidationFailed(
                "temperature thresholds must be finite",
            ));
        }
        if t.min >= t.warning {
            return Err(ConfigError::ValidationFailed(
                "temperature.min must be below temperature.warning",
            ));
        }
        if t.warning >= t.max {
            return Err(ConfigError::ValidationFailed(
                "temperature.warning must be below temperature.max",
            ));
        }
        if t.check_interval == 0 {
            return Err(ConfigError::ValidationFailed(
                "temperature.check_interval must be positive",
            ));
        }
        if self.pump.run_time == 0 {
            return Err(ConfigError::ValidationFailed(
                "pump.run_time must be positive",
            ));
        }
        Ok(())
    }

    /// Safety envelope derived from the temperature and pump sections.
    pub fn envelope(&self) -> SafetyEnvelope {
        SafetyEnvelope {
            min_temp: self.temperature.min,
            max_temp: self.temperature.max,
            warning_temp: self.temperature.warning,
            check_interval_ms: self.temperature.check_interval.saturating_mul(1000),
            run_time_ms: self.pump.run_time.saturating_mul(1000),
        }
    }
}
