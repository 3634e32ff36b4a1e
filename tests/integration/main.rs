//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against mock adapters. All tests run on the host (x86_64) with no
//! real hardware required; broker tests use loopback sockets.

#![cfg(not(target_os = "espidf"))]

mod broker_tests;
mod controller_tests;
mod mock_hw;
mod scheduler_tests;
