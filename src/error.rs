//! Unified error type for the doorbell firmware.
//!
//! Each port and driver reports its own error enum; this module gathers
//! them into a single `Error` so boot code can use `?` across subsystems.
//! Inside the main loop errors are logged where they occur and never
//! travel this far.

use core::fmt;

use crate::app::ports::{BusError, ConfigError, ConnectivityError, TimeSyncError};
use crate::drivers::hw_init::HwInitError;
use crate::mqtt::{BrokerError, packet::PacketError};

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Non-volatile configuration storage.
    Config(ConfigError),
    /// WiFi station.
    Connectivity(ConnectivityError),
    /// SNTP.
    TimeSync(TimeSyncError),
    /// The device's own broker session.
    Bus(BusError),
    /// Broker listener.
    Broker(BrokerError),
    /// MQTT wire format.
    Packet(PacketError),
    /// Peripheral initialisation.
    Init(HwInitError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Connectivity(e) => write!(f, "wifi: {e}"),
            Self::TimeSync(e) => write!(f, "time: {e}"),
            Self::Bus(e) => write!(f, "mqtt: {e}"),
            Self::Broker(e) => write!(f, "broker: {e}"),
            Self::Packet(e) => write!(f, "packet: {e}"),
            Self::Init(e) => write!(f, "init: {e}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<ConnectivityError> for Error {
    fn from(e: ConnectivityError) -> Self {
        Self::Connectivity(e)
    }
}

impl From<TimeSyncError> for Error {
    fn from(e: TimeSyncError) -> Self {
        Self::TimeSync(e)
    }
}

impl From<BusError> for Error {
    fn from(e: BusError) -> Self {
        Self::Bus(e)
    }
}

impl From<BrokerError> for Error {
    fn from(e: BrokerError) -> Self {
        Self::Broker(e)
    }
}

impl From<PacketError> for Error {
    fn from(e: PacketError) -> Self {
        Self::Packet(e)
    }
}

impl From<HwInitError> for Error {
    fn from(e: HwInitError) -> Self {
        Self::Init(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
