//! Doorbell broker firmware library.
//!
//! Exposes the domain, driver and adapter modules for integration testing.
//! All ESP-IDF-specific code is guarded by `#[cfg(target_os = "espidf")]`
//! within each module; on the host the adapters fall back to simulations.

#![deny(unused_must_use)]

pub mod app;
pub mod clock;
pub mod config;
pub mod mqtt;
pub mod pins;
pub mod ring_buffer;
pub mod scheduler;
pub mod timer;

pub mod adapters;
pub mod drivers;

mod error;

pub use error::{Error, Result};
