//! Safety evaluator.
//!
//! Pure classification of a temperature reading against the configured
//! envelope. The controller calls [`evaluate`] before energizing the pump
//! and at the top of every monitoring tick.
//!
//! ## Verdict precedence
//!
//! 1. `temp > max_temp` → [`Verdict::Critical`] (hard stop, any phase)
//! 2. `temp < min_temp` → [`Verdict::Low`] (blocks a cycle start only)
//! 3. `temp > warning_temp` → [`Verdict::High`] (advisory)
//! 4. otherwise [`Verdict::Safe`]
//!
//! `Critical` is decided first and independently of the other checks, so a
//! malformed envelope can never downgrade an over-temperature reading.
//! A NaN reading is classified `Critical`.

use core::fmt;

/// Temperature thresholds and cycle timing, in controller units
/// (Celsius and integer milliseconds).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SafetyEnvelope {
    pub min_temp: f32,
    pub max_temp: f32,
    pub warning_temp: f32,
    pub check_interval_ms: u64,
    pub run_time_ms: u64,
}

/// Outcome of one safety check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    Safe,
    Low,
    High,
    Critical,
}

impl Verdict {
    /// Whether a cycle may start at this temperature.
    pub fn permits_start(self) -> bool {
        matches!(self, Self::Safe | Self::High)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Safe => write!(f, "safe"),
            Self::Low => write!(f, "too low"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// Classify `temp` against `envelope`.
pub fn evaluate(temp: f32, envelope: &SafetyEnvelope) -> Verdict {
    if temp.is_nan() || temp > envelope.max_temp {
        return Verdict::Critical;
    }
    if temp < envelope.min_temp {
        return Verdict::Low;
    }
    if temp > envelope.warning_temp {
        return Verdict::High;
    }
    Verdict::Safe
}
