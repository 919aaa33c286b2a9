//! Application core: pure domain logic behind port traits.
//!
//! This module contains the business rules for the pump supervisor:
//! the duty-cycle orchestration around the FSM and the events it reports.
//! All interaction with hardware and the process table happens through
//! **port traits** defined in [`ports`], keeping this layer fully testable
//! without real peripherals.

pub mod events;
pub mod ports;
pub mod service;
