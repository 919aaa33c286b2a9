//! Outbound application events.
//!
//! The [`CycleController`](super::service::CycleController) emits these
//! through the [`EventSink`](super::ports::EventSink) port.  Adapters on
//! the other side decide what to do with them.

use serde::Serialize;

use crate::error::SensorError;
use crate::fsm::StateId;
use crate::fsm::context::{Fault, Outcome};

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// Hardware is open and the controller is ready (carries current state).
    Started(StateId),

    /// The sensor could not be opened; the cycle runs without checks.
    SensorUnavailable(SensorError),

    /// The FSM transitioned between states.
    StateChanged { from: StateId, to: StateId },

    /// Snapshot taken after each monitoring check.
    Telemetry(TelemetryData),

    /// A fault forced the cycle to abort.
    FaultDetected(Fault),

    /// The cycle reached a terminal state.
    Finished(CycleReport),
}

/// A point-in-time snapshot suitable for logging.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetryData {
    pub state: StateId,
    pub temperature_c: Option<f32>,
    pub elapsed_ms: u64,
    pub run_time_ms: u64,
    pub pump_on: bool,
}

/// Summary of one finished duty cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CycleReport {
    pub outcome: Outcome,
    pub initial_temp: Option<f32>,
    pub final_temp: Option<f32>,
    /// Pump run time actually accumulated, in milliseconds.
    pub elapsed_ms: u64,
    /// Monitoring checks performed.
    pub checks: u32,
}

impl CycleReport {
    /// Final minus initial temperature, when both were recorded.
    pub fn temp_change(&self) -> Option<f32> {
        Some(self.final_temp? - self.initial_temp?)
    }

    pub fn exit_code(&self) -> u8 {
        self.outcome.exit_code()
    }
}
