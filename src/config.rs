//! System configuration parameters
//!
//! Everything here is fixed at build time except [`ControllerConfig`], the
//! single flag that survives a power cycle.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::app::ports::ConnectivityError;

/// Main loop period. One tick.
pub const MAIN_LOOP_PERIOD_MS: u32 = 100;
/// Period of one blocking startup cycle (LED sweep).
pub const STARTUP_CYCLE_MS: u32 = 200;

/// Samples per raw ring-input capture window.
pub const RAW_WINDOW_LEN: usize = 100;
/// Completed raw windows kept for `getRawData`.
pub const RAW_ARCHIVE_LEN: usize = 20;
/// Entries kept in the action log.
pub const ACTION_LOG_LEN: usize = 50;

/// Maximum number of WiFi networks tried at boot.
pub const MAX_WIFI_CREDENTIALS: usize = 4;

/// Persisted controller state.
///
/// Postcard encodes the flag as a single `0`/`1` byte.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerConfig {
    pub auto_buzz: bool,
}

/// Tick counts for every timer in the system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timing {
    // --- Relays ---
    /// Buzzer relay on-time.
    pub door_open_ticks: u32,
    /// External bell relay on-time.
    pub ext_bell_ticks: u32,

    // --- Indicators ---
    pub ack_led_ticks: u32,
    pub error_led_ticks: u32,
    /// Doorbell LED blink window after a ring (one minute).
    pub bell_blink_ticks: u32,

    // --- Lifecycle ---
    /// Delay between a reboot request and the restart.
    pub reboot_wait_ticks: u32,
    /// Startup cycles spent waiting for each WiFi network.
    pub wifi_timeout_cycles: u32,
    pub ntp_refresh_ticks: u32,
    /// Seconds of startup cycles after a failed broker connect.
    pub broker_retry_secs: u32,

    // --- Debounce ---
    pub switch_debounce_ticks: u8,
    pub ring_debounce_ticks: u8,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            // Relays
            door_open_ticks: 50, // 5 s
            ext_bell_ticks: 10,  // 1 s

            // Indicators
            ack_led_ticks: 10,
            error_led_ticks: 10,
            bell_blink_ticks: 600,

            // Lifecycle
            reboot_wait_ticks: 20,
            wifi_timeout_cycles: 50, // 10 s of startup cycles
            ntp_refresh_ticks: 10,
            broker_retry_secs: 3,

            // Debounce
            switch_debounce_ticks: 2,
            ring_debounce_ticks: 5,
        }
    }
}

// ── Network ───────────────────────────────────────────────────

/// One WiFi network to try.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WifiCredential {
    pub ssid: heapless::String<32>,
    pub password: heapless::String<64>,
}

impl WifiCredential {
    /// Validate and copy a credential pair.
    ///
    /// SSID: 1-32 printable ASCII bytes. Password: empty (open network) or
    /// 8-64 bytes.
    pub fn new(ssid: &str, password: &str) -> Result<Self, ConnectivityError> {
        if ssid.is_empty() || !ssid.bytes().all(|b| (0x20..=0x7E).contains(&b)) {
            return Err(ConnectivityError::InvalidSsid);
        }
        if !password.is_empty() && !(8..=64).contains(&password.len()) {
            return Err(ConnectivityError::InvalidPassword);
        }

        let mut cred = Self {
            ssid: heapless::String::new(),
            password: heapless::String::new(),
        };
        cred.ssid
            .push_str(ssid)
            .map_err(|_| ConnectivityError::InvalidSsid)?;
        cred.password
            .push_str(password)
            .map_err(|_| ConnectivityError::InvalidPassword)?;
        Ok(cred)
    }
}

/// Network-side build-time settings.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Tried in order until one associates.
    pub credentials: heapless::Vec<WifiCredential, MAX_WIFI_CREDENTIALS>,
    pub ntp_server: &'static str,
    pub broker_port: u16,
    pub broker_max_clients: usize,
    /// Client id of the device's own broker session.
    pub client_id: &'static str,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            credentials: heapless::Vec::new(),
            ntp_server: "pool.ntp.org",
            broker_port: 1883,
            broker_max_clients: 9,
            client_id: "DoorbellBrokerESP32",
        }
    }
}

impl NetworkConfig {
    /// Defaults plus the WiFi credentials baked in at build time.
    pub fn from_build_env() -> Self {
        let mut cfg = Self::default();
        let pairs = [
            (
                option_env!("DOORBELL_WIFI_SSID"),
                option_env!("DOORBELL_WIFI_PASS"),
            ),
            (
                option_env!("DOORBELL_WIFI_SSID_2"),
                option_env!("DOORBELL_WIFI_PASS_2"),
            ),
        ];
        for (ssid, pass) in pairs {
            if let Some(ssid) = ssid {
                cfg.add_credential(ssid, pass.unwrap_or(""));
            }
        }
        if cfg.credentials.is_empty() {
            warn!("Config: no WiFi credentials compiled in (set DOORBELL_WIFI_SSID)");
        }
        cfg
    }

    /// Append a credential, logging and skipping invalid or excess entries.
    pub fn add_credential(&mut self, ssid: &str, password: &str) {
        match WifiCredential::new(ssid, password) {
            Ok(cred) => {
                if self.credentials.push(cred).is_err() {
                    warn!("Config: credential list full, ignoring '{}'", ssid);
                }
            }
            Err(e) => warn!("Config: skipping WiFi '{}': {}", ssid, e),
        }
    }
}
