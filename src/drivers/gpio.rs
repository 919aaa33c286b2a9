//! Output line on the Linux sysfs GPIO interface.
//!
//! ```text
//! /sys/class/gpio/export          ← "17"
//! /sys/class/gpio/gpio17/direction ← "low" | "high"   (output + initial level)
//! /sys/class/gpio/gpio17/value     ← "0" | "1"
//! /sys/class/gpio/unexport        ← "17"
//! ```
//!
//! Exposed through the `embedded-hal` 1.0 [`OutputPin`] trait so the
//! relay driver stays independent of the kernel interface.

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use embedded_hal::digital::{ErrorType, OutputPin};
use log::debug;

use crate::error::ActuatorError;

pub const SYSFS_GPIO_ROOT: &str = "/sys/class/gpio";

/// udev may take a moment to create and chmod the pin directory.
const EXPORT_POLL_ATTEMPTS: u32 = 10;
const EXPORT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// A line that can be handed back to the kernel.
pub trait ReleasableLine {
    fn unexport(&mut self) -> Result<(), ActuatorError>;
}

pub struct SysfsOutputPin {
    root: PathBuf,
    pin: u32,
    value: PathBuf,
}

impl SysfsOutputPin {
    /// Export `pin` under `root` and configure it as an output already
    /// driven to `initial_high`, so the line never glitches through the
    /// other level.
    pub fn open_in(root: &Path, pin: u32, initial_high: bool) -> Result<Self, ActuatorError> {
        let dir = root.join(format!("gpio{pin}"));
        if !dir.is_dir() {
            debug!("GPIO | exporting {pin}");
            fs::write(root.join("export"), pin.to_string())
                .map_err(|e| ActuatorError::GpioSetupFailed(e.kind()))?;
        }

        let direction = dir.join("direction");
        let level = if initial_high { "high" } else { "low" };
        let mut attempt = 0;
        loop {
            match fs::write(&direction, level) {
                Ok(()) => break,
                Err(e) if attempt + 1 >= EXPORT_POLL_ATTEMPTS => {
                    return Err(ActuatorError::GpioSetupFailed(e.kind()));
                }
                Err(_) => {
                    attempt += 1;
                    thread::sleep(EXPORT_POLL_INTERVAL);
                }
            }
        }

        Ok(Self {
            root: root.to_path_buf(),
            pin,
            value: dir.join("value"),
        })
    }

    pub fn pin(&self) -> u32 {
        self.pin
    }

    fn write_level(&mut self, high: bool) -> Result<(), ActuatorError> {
        fs::write(&self.value, if high { "1" } else { "0" })
            .map_err(|e| ActuatorError::GpioWriteFailed(e.kind()))
    }
}

impl ErrorType for SysfsOutputPin {
    type Error = ActuatorError;
}

impl OutputPin for SysfsOutputPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.write_level(false)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.write_level(true)
    }
}

impl ReleasableLine for SysfsOutputPin {
    fn unexport(&mut self) -> Result<(), ActuatorError> {
        debug!("GPIO | unexporting {}", self.pin);
        fs::write(self.root.join("unexport"), self.pin.to_string())
            .map_err(|e| ActuatorError::GpioSetupFailed(e.kind()))
    }
}
