//! Shared mutable context threaded through every FSM handler.
//!
//! `CycleContext` is the single struct that state handlers read from and
//! write to: the safety envelope, the latest temperature input, elapsed
//! run time, the desired relay level, and any fault the controller hit
//! while talking to hardware.

use core::fmt;

use serde::Serialize;

use crate::error::{ActuatorError, SensorError};
use crate::safety::SafetyEnvelope;

// ---------------------------------------------------------------------------
// Inputs (written by the controller before each tick)
// ---------------------------------------------------------------------------

/// Latest temperature input for the current tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Reading {
    /// No reading was taken (no sensor, or nothing due this tick).
    #[default]
    NotTaken,
    /// The sensor gave up after its internal retries.
    Failed,
    /// A valid reading in Celsius.
    Celsius(f32),
}

/// Unexpected fault that forces the cycle to abort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    Sensor(SensorError),
    Actuator(ActuatorError),
    /// A shutdown request interrupted the monitoring sleep.
    Interrupted,
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensor(e) => write!(f, "sensor fault: {e}"),
            Self::Actuator(e) => write!(f, "actuator fault: {e}"),
            Self::Interrupted => write!(f, "interrupted by shutdown request"),
        }
    }
}

// ---------------------------------------------------------------------------
// Outputs
// ---------------------------------------------------------------------------

/// Commands that state handlers write to request actuator actions.
/// The controller applies these to the relay line after every tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActuatorCommands {
    /// Desired relay level: `true` = pump energized.
    pub pump_on: bool,
}

impl ActuatorCommands {
    /// Relay off.
    pub fn all_off() -> Self {
        Self::default()
    }
}

/// Result of one duty cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    SkippedUnsafe,
    AbortedCritical,
    AbortedError,
}

impl Outcome {
    /// Process exit status for this outcome.
    pub fn exit_code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::SkippedUnsafe | Self::AbortedCritical | Self::AbortedError => 1,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::SkippedUnsafe => write!(f, "skipped_unsafe"),
            Self::AbortedCritical => write!(f, "aborted_critical"),
            Self::AbortedError => write!(f, "aborted_error"),
        }
    }
}

// ---------------------------------------------------------------------------
// CycleContext
// ---------------------------------------------------------------------------

/// The shared context passed to every state handler function.
pub struct CycleContext {
    // -- Configuration --
    pub envelope: SafetyEnvelope,
    /// Whether a temperature sensor was found at initialisation.
    pub sensor_present: bool,

    // -- Inputs --
    pub reading: Reading,
    /// Run time accumulated by completed monitoring sleeps.
    pub elapsed_ms: u64,
    pub fault: Option<Fault>,

    // -- Record --
    pub initial_temp: Option<f32>,
    pub final_temp: Option<f32>,
    /// Number of monitoring checks performed this cycle.
    pub checks: u32,

    // -- Outputs --
    pub commands: ActuatorCommands,
}

impl CycleContext {
    pub fn new(envelope: SafetyEnvelope, sensor_present: bool) -> Self {
        Self {
            envelope,
            sensor_present,
            reading: Reading::NotTaken,
            elapsed_ms: 0,
            fault: None,
            initial_temp: None,
            final_temp: None,
            checks: 0,
            commands: ActuatorCommands::all_off(),
        }
    }

    /// Run time still to go, in milliseconds.
    pub fn remaining_ms(&self) -> u64 {
        self.envelope.run_time_ms.saturating_sub(self.elapsed_ms)
    }

    /// Length of the next monitoring sleep: `min(check_interval, remaining)`.
    pub fn next_sleep_ms(&self) -> u64 {
        self.envelope.check_interval_ms.min(self.remaining_ms())
    }

    /// Cycle progress as a percentage of the configured run time.
    pub fn progress_percent(&self) -> f32 {
        if self.envelope.run_time_ms == 0 {
            return 100.0;
        }
        (self.elapsed_ms as f64 / self.envelope.run_time_ms as f64 * 100.0) as f32
    }
}
