//! Port traits — the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Controller / NetworkManager / ProtocolHandler
//! ```
//!
//! Driven adapters (GPIO board, NVS, WiFi, SNTP, the local broker) implement
//! these traits. The domain components consume them through `&mut dyn` or
//! generics, so none of them touch hardware or sockets directly.

use core::fmt;

use embedded_hal::delay::DelayNs;

use crate::config::{ControllerConfig, WifiCredential};

// ───────────────────────────────────────────────────────────────
// Board roles
// ───────────────────────────────────────────────────────────────

/// Debounced digital inputs, by logical role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Input {
    /// Toggles auto-buzz.
    BuzzModeSwitch,
    /// Acknowledge the ring and open the door.
    AckBuzzSwitch,
    /// Acknowledge the ring only.
    AckSwitch,
    /// Ring sensor from the door intercom.
    Ring,
}

/// Status LEDs, in startup-sweep order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Led {
    Power,
    AckAutoBuzz,
    Spare,
    Error,
    Doorbell,
}

impl Led {
    /// Every LED in sweep order.
    pub const ALL: [Led; 5] = [
        Led::Power,
        Led::AckAutoBuzz,
        Led::Spare,
        Led::Error,
        Led::Doorbell,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relay {
    /// Door opener.
    Buzzer,
    /// External bell.
    ExtBell,
}

// ───────────────────────────────────────────────────────────────
// Board ports (driven adapter: domain ↔ GPIO)
// ───────────────────────────────────────────────────────────────

/// Read-side board port.
pub trait InputPort {
    /// Instantaneous raw state; `true` = active (pressed / ringing).
    fn is_active(&mut self, input: Input) -> bool;
}

/// Write-side board port.
pub trait OutputPort {
    fn set_led(&mut self, led: Led, on: bool);
    fn set_relay(&mut self, relay: Relay, energized: bool);
    /// On-board LED used as proof of life.
    fn set_heartbeat(&mut self, on: bool);
}

/// Everything the controller drives on the board.
pub trait Board: InputPort + OutputPort {}

impl<T: InputPort + OutputPort + ?Sized> Board for T {}

// ───────────────────────────────────────────────────────────────
// Event sink port (domain → protocol handler)
// ───────────────────────────────────────────────────────────────

/// Observer for controller events, one method per event.
pub trait EventSink {
    /// A ring was detected (or simulated when `test`).
    fn on_ring(&mut self, test: bool, auto_buzz: bool);
    /// The buzzer was requested; `auto` is the auto-buzz state at the time.
    fn on_buzz(&mut self, auto: bool);
    fn on_auto_buzz_changed(&mut self, enabled: bool);
    fn on_ring_acknowledged(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (domain ↔ non-volatile storage)
// ───────────────────────────────────────────────────────────────

/// Loads and persists the controller configuration.
pub trait ConfigPort {
    fn load(&self) -> Result<ControllerConfig, ConfigError>;
    fn save(&mut self, config: &ControllerConfig) -> Result<(), ConfigError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Storage could not be opened, read or committed.
    IoError,
    /// Stored bytes do not decode.
    Corrupted,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IoError => write!(f, "storage I/O error"),
            Self::Corrupted => write!(f, "stored config is corrupted"),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Connectivity port (domain ↔ WiFi station)
// ───────────────────────────────────────────────────────────────

pub trait ConnectivityPort {
    /// Start associating with `credential`. Returns without waiting for
    /// the link; poll [`is_connected`](Self::is_connected).
    fn begin(&mut self, credential: &WifiCredential) -> Result<(), ConnectivityError>;
    /// Associated and holding an IP address.
    fn is_connected(&self) -> bool;
    fn disconnect(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityError {
    InvalidSsid,
    InvalidPassword,
    /// The driver refused to start the association.
    ConnectionFailed,
}

impl fmt::Display for ConnectivityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => {
                write!(f, "password invalid (must be 8-64 bytes, or empty for open)")
            }
            Self::ConnectionFailed => write!(f, "WiFi connection failed"),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Time port
// ───────────────────────────────────────────────────────────────

pub trait TimeSource {
    /// Start synchronising the system clock against `server`.
    fn start_sync(&mut self, server: &str) -> Result<(), TimeSyncError>;
    /// Pull a fresh time sample. Backends that sync in the background
    /// may treat this as a no-op.
    fn refresh(&mut self);
    /// Current UTC time in Unix seconds, `None` if the clock holds nothing.
    fn unix_time(&self) -> Option<i64>;
    /// Seconds since boot.
    fn uptime_secs(&self) -> u64;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeSyncError {
    /// The SNTP service could not be started.
    Unavailable,
}

impl fmt::Display for TimeSyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable => write!(f, "time sync service unavailable"),
        }
    }
}

/// Human-readable device time, as stamped on log entries.
pub trait WallClock {
    fn date_time(&self) -> String;
}

// ───────────────────────────────────────────────────────────────
// Message bus port (protocol handler ↔ broker)
// ───────────────────────────────────────────────────────────────

/// A message delivered to the device's own broker session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: String,
}

/// The device's session on its own broker.
pub trait MessageBus {
    /// Start the broker service. Idempotent.
    fn start(&mut self) -> Result<(), BusError>;
    fn connect(&mut self, client_id: &str) -> Result<(), BusError>;
    fn is_connected(&self) -> bool;
    fn subscribe(&mut self, topic: &str) -> Result<(), BusError>;
    fn publish(&mut self, topic: &str, payload: &str) -> Result<(), BusError>;
    /// Service the transport once (accept, read, route).
    fn poll(&mut self);
    /// Next message queued for this session, oldest first.
    fn take_message(&mut self) -> Option<InboundMessage>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
    /// The broker service is not running.
    BrokerDown,
    NotConnected,
    /// Payload does not fit a single packet.
    PayloadTooLarge,
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BrokerDown => write!(f, "broker not running"),
            Self::NotConnected => write!(f, "not connected to broker"),
            Self::PayloadTooLarge => write!(f, "payload too large"),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Restart port
// ───────────────────────────────────────────────────────────────

pub trait RestartPort {
    /// Restart the device. Does not return on hardware.
    fn restart(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Per-tick I/O bundle
// ───────────────────────────────────────────────────────────────

/// Board-level collaborators lent to the domain for one tick.
pub struct DeviceIo<'a> {
    pub board: &'a mut dyn Board,
    pub storage: &'a mut dyn ConfigPort,
    pub delay: &'a mut dyn DelayNs,
}
