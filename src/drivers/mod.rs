//! Actuator drivers: the sysfs GPIO line and the relay on top of it.

pub mod gpio;
pub mod relay;
