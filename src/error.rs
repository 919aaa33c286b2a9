//! Unified error types for the pump supervisor.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! controller's error handling uniform. All variants are `Copy` (I/O
//! failures are carried as [`std::io::ErrorKind`]) so they can be passed
//! through the shutdown path and the FSM context without allocation.

use core::fmt;
use std::io;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible controller operation funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The temperature sensor could not be opened or read.
    Sensor(SensorError),
    /// An actuator command failed.
    Actuator(ActuatorError),
    /// The process singleton lock could not be taken.
    Lock(LockError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Actuator(e) => write!(f, "actuator: {e}"),
            Self::Lock(e) => write!(f, "lock: {e}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// No DS18B20 device is visible on the 1-Wire bus.
    DeviceNotFound,
    /// The device file returned data that cannot be interpreted.
    Malformed,
    /// The device file could not be read.
    Io(io::ErrorKind),
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeviceNotFound => write!(f, "DS18B20 not found, check wiring"),
            Self::Malformed => write!(f, "malformed sensor data"),
            Self::Io(kind) => write!(f, "sensor I/O error: {kind}"),
        }
    }
}

impl std::error::Error for SensorError {}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Actuator errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorError {
    /// Writing the GPIO line failed.
    GpioWriteFailed(io::ErrorKind),
    /// Exporting or configuring the GPIO line failed.
    GpioSetupFailed(io::ErrorKind),
    /// Shutdown has latched the line off; it can no longer be energized.
    Latched,
    /// No actuator has been installed on the line yet.
    NotInstalled,
}

impl fmt::Display for ActuatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GpioWriteFailed(kind) => write!(f, "GPIO write failed: {kind}"),
            Self::GpioSetupFailed(kind) => write!(f, "GPIO setup failed: {kind}"),
            Self::Latched => write!(f, "line latched off by shutdown"),
            Self::NotInstalled => write!(f, "no actuator installed"),
        }
    }
}

impl std::error::Error for ActuatorError {}

impl embedded_hal::digital::Error for ActuatorError {
    fn kind(&self) -> embedded_hal::digital::ErrorKind {
        embedded_hal::digital::ErrorKind::Other
    }
}

impl From<ActuatorError> for Error {
    fn from(e: ActuatorError) -> Self {
        Self::Actuator(e)
    }
}

// ---------------------------------------------------------------------------
// Singleton lock errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockError {
    /// A live controller process already owns the lock.
    AlreadyRunning { pid: u32 },
    /// The lock file could not be created or inspected.
    Io(io::ErrorKind),
}

impl fmt::Display for LockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyRunning { pid } => {
                write!(f, "pump controller is already running (pid {pid})")
            }
            Self::Io(kind) => write!(f, "lock file I/O error: {kind}"),
        }
    }
}

impl std::error::Error for LockError {}

impl From<LockError> for Error {
    fn from(e: LockError) -> Self {
        Self::Lock(e)
    }
}
