//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ CycleController (domain)
//! ```
//!
//! Driven adapters (relay, temperature sensor, process table, event sinks,
//! config file) implement these traits.  The
//! [`CycleController`](super::service::CycleController) consumes them via
//! generics, so the domain core never touches sysfs or procfs directly.

use std::io;
use std::sync::Arc;

use crate::config::{PumpConfig, SystemConfig, TemperatureConfig};
use crate::error::{ActuatorError, SensorError};

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port for the single pump relay.
pub trait ActuatorPort {
    /// Drive the relay to the pump-on level.
    fn energize(&mut self) -> Result<(), ActuatorError>;

    /// Drive the relay to the pump-off level.
    fn de_energize(&mut self) -> Result<(), ActuatorError>;

    /// Last level commanded through this port.
    fn is_energized(&self) -> bool;

    /// Give the line back to the OS.  The relay must already be off.
    fn release(&mut self) -> Result<(), ActuatorError>;
}

// ───────────────────────────────────────────────────────────────
// Temperature port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port for the fermentation temperature probe.
pub trait TemperaturePort {
    /// One reading in Celsius.
    ///
    /// Retries internally; `Ok(None)` means every attempt failed.  `Err`
    /// is reserved for data that cannot be interpreted at all.
    fn read_celsius(&mut self) -> Result<Option<f32>, SensorError>;
}

// ───────────────────────────────────────────────────────────────
// Platform (factory for the hardware adapters)
// ───────────────────────────────────────────────────────────────

/// Opens the hardware the controller needs.  Called once during
/// initialisation.
pub trait Platform {
    type Actuator: ActuatorPort + Send + 'static;
    type Sensor: TemperaturePort;

    fn open_actuator(&mut self, config: &PumpConfig) -> Result<Self::Actuator, ActuatorError>;

    fn open_sensor(&mut self, config: &TemperatureConfig) -> Result<Self::Sensor, SensorError>;
}

// ───────────────────────────────────────────────────────────────
// Sleeper (monitoring cadence)
// ───────────────────────────────────────────────────────────────

/// How a sleep ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    Elapsed,
    /// Shutdown was requested before the interval ran out.
    Interrupted,
}

/// Blocks the monitoring loop between checks.
pub trait Sleeper {
    fn sleep(&self, ms: u64) -> Wake;
}

impl<T: Sleeper + ?Sized> Sleeper for Arc<T> {
    fn sleep(&self, ms: u64) -> Wake {
        (**self).sleep(ms)
    }
}

// ───────────────────────────────────────────────────────────────
// Process probe (singleton staleness)
// ───────────────────────────────────────────────────────────────

/// What the process table says about a recorded lock owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    /// No such process.
    Gone,
    /// The PID exists but belongs to some other program.
    Foreign,
    /// A live pump controller.
    Controller,
}

pub trait ProcessProbe {
    fn probe(&self, pid: u32) -> Liveness;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port
// ───────────────────────────────────────────────────────────────

/// Loads the system configuration.
///
/// Implementations must run [`SystemConfig::validate`] before returning;
/// an inconsistent safety envelope is rejected with
/// [`ConfigError::ValidationFailed`], never clamped.
pub trait ConfigPort {
    /// Returns [`SystemConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<SystemConfig, ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The config file exists but could not be read.
    Unreadable(io::ErrorKind),
    /// The file is not valid YAML for [`SystemConfig`].
    Malformed(String),
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Unreadable(kind) => write!(f, "config unreadable: {kind}"),
            Self::Malformed(msg) => write!(f, "config malformed: {msg}"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}
