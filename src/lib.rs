//! Fermentation pump supervisor library.
//!
//! Exposes the controller core, its ports, and the Linux adapters so the
//! `pumpctl` binary and the integration tests share one implementation.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod error;
pub mod fsm;
pub mod runtime;
pub mod safety;
pub mod shutdown;
pub mod signals;

pub mod adapters;
pub mod drivers;
pub mod sensors;
