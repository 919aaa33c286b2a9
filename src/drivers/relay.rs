//! Pump relay driver.
//!
//! One digital output switching the pump's mains relay.  Most relay
//! boards energize on a high level; `active_low` boards are supported by
//! inverting the line.
//!
//! ## Safety contract
//!
//! The pump must never run outside the temperature envelope.  That is
//! enforced by the cycle FSM; this driver is a dumb actuator that starts
//! de-energized.

use embedded_hal::digital::OutputPin;

use super::gpio::ReleasableLine;
use crate::app::ports::ActuatorPort;
use crate::error::ActuatorError;

pub struct RelayDriver<P> {
    pin: P,
    /// Relay ON = line LOW.
    active_low: bool,
    energized: bool,
}

impl<P> RelayDriver<P>
where
    P: OutputPin<Error = ActuatorError> + ReleasableLine,
{
    /// Wrap `pin` and drive the relay off.
    pub fn new(pin: P, active_low: bool) -> Result<Self, ActuatorError> {
        let mut relay = Self {
            pin,
            active_low,
            energized: true,
        };
        relay.drive(false)?;
        Ok(relay)
    }

    /// Line level that leaves the relay de-energized.
    pub fn off_level_high(active_low: bool) -> bool {
        active_low
    }

    fn drive(&mut self, on: bool) -> Result<(), ActuatorError> {
        if on != self.active_low {
            self.pin.set_high()?;
        } else {
            self.pin.set_low()?;
        }
        self.energized = on;
        Ok(())
    }
}

impl<P> ActuatorPort for RelayDriver<P>
where
    P: OutputPin<Error = ActuatorError> + ReleasableLine,
{
    fn energize(&mut self) -> Result<(), ActuatorError> {
        self.drive(true)
    }

    fn de_energize(&mut self) -> Result<(), ActuatorError> {
        self.drive(false)
    }

    fn is_energized(&self) -> bool {
        self.energized
    }

    fn release(&mut self) -> Result<(), ActuatorError> {
        self.pin.unexport()
    }
}
