//! Hardware adapter: bridges the Linux peripherals to the domain ports.
//!
//! Opens the relay on the sysfs GPIO interface and the DS18B20 on the
//! 1-Wire bus.  This is the only module that decides which kernel paths
//! the controller touches; tests point it at a temporary directory.

use std::path::PathBuf;

use log::debug;

use crate::app::ports::Platform;
use crate::config::{PumpConfig, TemperatureConfig};
use crate::drivers::gpio::{SYSFS_GPIO_ROOT, SysfsOutputPin};
use crate::drivers::relay::RelayDriver;
use crate::error::{ActuatorError, SensorError};
use crate::sensors::ds18b20::{Ds18b20Sensor, W1_DEVICES_DIR};

/// Concrete platform for a Raspberry Pi class board.
pub struct LinuxPlatform {
    gpio_root: PathBuf,
    w1_root: PathBuf,
}

impl LinuxPlatform {
    pub fn new() -> Self {
        Self::with_roots(SYSFS_GPIO_ROOT.into(), W1_DEVICES_DIR.into())
    }

    pub fn with_roots(gpio_root: PathBuf, w1_root: PathBuf) -> Self {
        Self { gpio_root, w1_root }
    }

    /// Open the relay and drive it off.  Used both by the controller and
    /// by `emergency-stop`.
    pub fn open_relay(
        &self,
        config: &PumpConfig,
    ) -> Result<RelayDriver<SysfsOutputPin>, ActuatorError> {
        let off_high = RelayDriver::<SysfsOutputPin>::off_level_high(config.active_low);
        let pin = SysfsOutputPin::open_in(&self.gpio_root, config.gpio_pin, off_high)?;
        RelayDriver::new(pin, config.active_low)
    }
}

impl Default for LinuxPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl Platform for LinuxPlatform {
    type Actuator = RelayDriver<SysfsOutputPin>;
    type Sensor = Ds18b20Sensor;

    fn open_actuator(&mut self, config: &PumpConfig) -> Result<Self::Actuator, ActuatorError> {
        self.open_relay(config)
    }

    fn open_sensor(&mut self, config: &TemperatureConfig) -> Result<Self::Sensor, SensorError> {
        debug!(
            "TEMP | looking for DS18B20 (1-Wire data on GPIO {})",
            config.gpio_pin
        );
        Ds18b20Sensor::discover_in(&self.w1_root)
    }
}
