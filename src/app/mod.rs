//! Application core: the doorbell's domain logic.
//!
//! Everything here talks to the outside world through the **port traits**
//! in [`ports`], so the controller, the network manager and the protocol
//! handler run unchanged against fakes in host tests.

pub mod commands;
pub mod controller;
pub mod events;
pub mod network;
pub mod ports;
pub mod protocol;
pub mod relay;
