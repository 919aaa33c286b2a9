//! Status record: the last lifecycle stage, published for other processes.
//!
//! The file holds a bare stage name and is overwritten at every
//! transition.  Publishing is best-effort: an I/O error is logged and
//! swallowed, never propagated into the cycle.  Readers give the lock
//! record precedence: no valid owner means `idle`, whatever the file says.

use core::fmt;
use core::str::FromStr;
use std::fs;
use std::sync::Arc;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::RuntimePaths;
use super::singleton::{LockStatus, SingletonGuard};
use crate::app::ports::ProcessProbe;

/// Lifecycle stage, serialized as its snake_case name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Initializing,
    Ready,
    CycleStarting,
    Monitoring,
    PumpOn,
    PumpOff,
    Completed,
    Idle,
}

impl Stage {
    pub const ALL: [Stage; 8] = [
        Self::Initializing,
        Self::Ready,
        Self::CycleStarting,
        Self::Monitoring,
        Self::PumpOn,
        Self::PumpOff,
        Self::Completed,
        Self::Idle,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Initializing => "initializing",
            Self::Ready => "ready",
            Self::CycleStarting => "cycle_starting",
            Self::Monitoring => "monitoring",
            Self::PumpOn => "pump_on",
            Self::PumpOff => "pump_off",
            Self::Completed => "completed",
            Self::Idle => "idle",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The text is not one of the known stage names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStage(pub String);

impl fmt::Display for UnknownStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown stage '{}'", self.0)
    }
}

impl std::error::Error for UnknownStage {}

impl FromStr for Stage {
    type Err = UnknownStage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| UnknownStage(s.to_string()))
    }
}

/// Writes stages on behalf of the lock owner.
///
/// Tied to the owner's [`SingletonGuard`]: once the guard is released the
/// publisher goes inert, so a late transition cannot recreate a status
/// file next to a missing lock.
pub struct StatePublisher {
    guard: Arc<SingletonGuard>,
}

impl StatePublisher {
    pub fn new(guard: Arc<SingletonGuard>) -> Self {
        Self { guard }
    }

    /// Overwrite the status file with `stage`.  Never fails.
    pub fn publish(&self, stage: Stage) {
        let path = &self.guard.paths().state;
        let written = self.guard.while_held(|| {
            if let Err(e) = fs::write(path, stage.as_str()) {
                warn!("STATUS | could not write {}: {e}", path.display());
            }
        });
        if written.is_none() {
            debug!("STATUS | lock released, dropping stage {stage}");
        }
    }
}

/// Effective stage as seen by any process.
///
/// Lock absent or stale → [`Stage::Idle`] (stale records are cleared).
/// Valid owner but no readable status yet → [`Stage::Initializing`].
pub fn read(paths: &RuntimePaths, probe: &impl ProcessProbe) -> Stage {
    match SingletonGuard::inspect(paths, probe) {
        LockStatus::Idle => Stage::Idle,
        LockStatus::OwnedBy(_) => read_recorded(paths).unwrap_or(Stage::Initializing),
    }
}

/// Raw status-file contents, without consulting the lock.
pub fn read_recorded(paths: &RuntimePaths) -> Option<Stage> {
    fs::read_to_string(&paths.state).ok()?.parse().ok()
}
