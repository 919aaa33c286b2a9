//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against mock adapters.  All tests run on the host with no real relay
//! or 1-Wire bus required.

mod mock_hw;
mod shutdown_tests;
mod singleton_tests;
