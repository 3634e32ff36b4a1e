//! WiFi station-mode adapter.
//!
//! Implements [`ConnectivityPort`]. `begin` only kicks off an association;
//! the network manager polls [`is_connected`](ConnectivityPort::is_connected)
//! between startup cycles and decides when to give up.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `esp_idf_svc::wifi::EspWifi` in STA mode.
//! - **all other targets**: a simulated access-point list for host tests.

use log::{info, warn};

use crate::app::ports::{ConnectivityError, ConnectivityPort};
use crate::config::WifiCredential;

#[cfg(target_os = "espidf")]
use esp_idf_svc::{
    eventloop::EspSystemEventLoop,
    hal::modem::Modem,
    nvs::EspDefaultNvsPartition,
    wifi::{AuthMethod, ClientConfiguration, Configuration, EspWifi},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiState {
    Idle,
    /// Association started, link not up yet.
    Connecting,
}

pub struct WifiAdapter {
    state: WifiState,
    ssid: heapless::String<32>,

    #[cfg(target_os = "espidf")]
    wifi: EspWifi<'static>,

    /// Simulation: access points in range, by SSID and password.
    #[cfg(not(target_os = "espidf"))]
    sim_networks: Vec<WifiCredential>,
    #[cfg(not(target_os = "espidf"))]
    sim_link_up: bool,
}

impl WifiAdapter {
    #[cfg(target_os = "espidf")]
    pub fn new(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        nvs: Option<EspDefaultNvsPartition>,
    ) -> Result<Self, esp_idf_svc::sys::EspError> {
        let wifi = EspWifi::new(modem, sysloop, nvs)?;
        info!("WiFi: driver created");
        Ok(Self {
            state: WifiState::Idle,
            ssid: heapless::String::new(),
            wifi,
        })
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Self {
        info!("WiFi(sim): no access points in range");
        Self {
            state: WifiState::Idle,
            ssid: heapless::String::new(),
            sim_networks: Vec::new(),
            sim_link_up: false,
        }
    }

    pub fn state(&self) -> WifiState {
        self.state
    }

    /// SSID of the last association attempt.
    pub fn ssid(&self) -> &str {
        &self.ssid
    }

    // ── Simulation controls ───────────────────────────────────

    /// Put an access point in range.
    #[cfg(not(target_os = "espidf"))]
    pub fn add_sim_network(&mut self, credential: WifiCredential) {
        self.sim_networks.push(credential);
    }

    /// Drop the current link, as if the access point went away.
    #[cfg(not(target_os = "espidf"))]
    pub fn drop_sim_link(&mut self) {
        if self.sim_link_up {
            info!("WiFi(sim): link dropped");
        }
        self.sim_link_up = false;
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_begin(&mut self, credential: &WifiCredential) -> Result<(), ConnectivityError> {
        let auth_method = if credential.password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        let config = Configuration::Client(ClientConfiguration {
            ssid: credential
                .ssid
                .as_str()
                .try_into()
                .map_err(|()| ConnectivityError::InvalidSsid)?,
            password: credential
                .password
                .as_str()
                .try_into()
                .map_err(|()| ConnectivityError::InvalidPassword)?,
            auth_method,
            ..Default::default()
        });

        let start = |wifi: &mut EspWifi<'static>| -> Result<(), esp_idf_svc::sys::EspError> {
            wifi.set_configuration(&config)?;
            if !wifi.is_started()? {
                wifi.start()?;
            }
            wifi.connect()
        };
        start(&mut self.wifi).map_err(|e| {
            warn!("WiFi: driver error {}", e);
            ConnectivityError::ConnectionFailed
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_begin(&mut self, credential: &WifiCredential) -> Result<(), ConnectivityError> {
        self.sim_link_up = self.sim_networks.iter().any(|n| n == credential);
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_is_connected(&self) -> bool {
        self.wifi.is_up().unwrap_or(false)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_is_connected(&self) -> bool {
        self.sim_link_up
    }

    #[cfg(target_os = "espidf")]
    fn platform_disconnect(&mut self) {
        if let Err(e) = self.wifi.disconnect() {
            warn!("WiFi: disconnect failed: {}", e);
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_disconnect(&mut self) {
        self.sim_link_up = false;
    }
}

#[cfg(not(target_os = "espidf"))]
impl Default for WifiAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectivityPort for WifiAdapter {
    fn begin(&mut self, credential: &WifiCredential) -> Result<(), ConnectivityError> {
        self.ssid.clone_from(&credential.ssid);
        self.platform_begin(credential)?;
        self.state = WifiState::Connecting;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.platform_is_connected()
    }

    fn disconnect(&mut self) {
        self.platform_disconnect();
        self.state = WifiState::Idle;
        info!("WiFi: disconnected from '{}'", self.ssid);
    }
}
