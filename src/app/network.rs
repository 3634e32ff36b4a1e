//! Network and time manager.
//!
//! Brings the WiFi link up once at boot, then watches it. The link is never
//! re-associated in place: losing it requests a controller reboot, and the
//! next boot starts association from scratch.
//!
//! ## Boot association
//!
//! Credentials are tried in order. For each one the manager starts the
//! association and polls it for at most `wifi_timeout_cycles` startup
//! cycles. This is the one blocking path of the firmware; the caller's
//! startup-cycle callback keeps the LEDs sweeping meanwhile.
//!
//! ## Time
//!
//! Once associated, SNTP is started. Every `ntp_refresh_ticks` the time is
//! refreshed; the first sane reading latches `time_valid`.

use log::{info, warn};

use crate::clock;
use crate::config::{Timing, WifiCredential};
use crate::timer::EventTimer;

use super::controller::Controller;
use super::ports::{ConnectivityPort, TimeSource, WallClock};

/// Notable transitions reported by [`NetworkManager::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkEvent {
    /// The clock showed a sane date for the first time.
    TimeAcquired,
    /// The WiFi link is gone; a reboot has been requested.
    LinkLost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Associated,
}

pub struct NetworkManager<W: ConnectivityPort, T: TimeSource> {
    wifi: W,
    time: T,
    state: ConnectionState,
    time_valid: bool,
    ntp_timer: EventTimer,
    wifi_timeout_cycles: u32,
    link_loss_reported: bool,
}

impl<W: ConnectivityPort, T: TimeSource> NetworkManager<W, T> {
    pub fn new(wifi: W, time: T, timing: &Timing) -> Self {
        Self {
            wifi,
            time,
            state: ConnectionState::Disconnected,
            time_valid: false,
            ntp_timer: EventTimer::new(timing.ntp_refresh_ticks, true),
            wifi_timeout_cycles: timing.wifi_timeout_cycles,
            link_loss_reported: false,
        }
    }

    /// Associate with the first reachable network, then start time sync.
    ///
    /// `startup_cycle` runs once per poll while waiting for a link.
    pub fn setup(
        &mut self,
        credentials: &[WifiCredential],
        ntp_server: &str,
        startup_cycle: &mut dyn FnMut(),
    ) {
        info!("Network: setup ({} network(s) configured)", credentials.len());

        for credential in credentials {
            if self.associate(credential, startup_cycle) {
                self.state = ConnectionState::Associated;
                break;
            }
        }

        if self.state != ConnectionState::Associated {
            warn!("Network: no WiFi network reachable");
            return;
        }

        if let Err(e) = self.time.start_sync(ntp_server) {
            warn!("Network: time sync not started: {}", e);
        }
        self.time_valid = self.clock_is_sane();
    }

    fn associate(&mut self, credential: &WifiCredential, startup_cycle: &mut dyn FnMut()) -> bool {
        info!("Network: connecting to WiFi '{}'", credential.ssid);
        if let Err(e) = self.wifi.begin(credential) {
            warn!("Network: WiFi '{}' rejected: {}", credential.ssid, e);
            return false;
        }

        let mut cycles = 0;
        while !self.wifi.is_connected() {
            startup_cycle();
            cycles += 1;
            if cycles > self.wifi_timeout_cycles {
                warn!("Network: WiFi connection timeout for '{}'", credential.ssid);
                self.wifi.disconnect();
                return false;
            }
        }

        info!("Network: WiFi '{}' connected", credential.ssid);
        true
    }

    /// Per-tick link watch and time refresh.
    pub fn tick(&mut self, controller: &mut Controller) -> Option<NetworkEvent> {
        if !self.wifi.is_connected() {
            self.state = ConnectionState::Disconnected;
            controller.reboot();
            if self.link_loss_reported {
                return None;
            }
            self.link_loss_reported = true;
            warn!("Network: WiFi disconnected, reboot");
            return Some(NetworkEvent::LinkLost);
        }

        if self.ntp_timer.fire_and_rearm() {
            self.time.refresh();
        }

        if !self.time_valid && self.clock_is_sane() {
            self.time_valid = true;
            info!("Network: received first NTP time");
            return Some(NetworkEvent::TimeAcquired);
        }
        None
    }

    fn clock_is_sane(&self) -> bool {
        self.time.unix_time().is_some_and(clock::is_sane_year)
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_associated(&self) -> bool {
        self.state == ConnectionState::Associated
    }

    pub fn time_valid(&self) -> bool {
        self.time_valid
    }

    pub fn wifi(&self) -> &W {
        &self.wifi
    }

    pub fn wifi_mut(&mut self) -> &mut W {
        &mut self.wifi
    }

    pub fn time_source_mut(&mut self) -> &mut T {
        &mut self.time
    }
}

impl<W: ConnectivityPort, T: TimeSource> WallClock for NetworkManager<W, T> {
    fn date_time(&self) -> String {
        if self.time_valid {
            if let Some(stamp) = self.time.unix_time().and_then(clock::format_local) {
                return stamp;
            }
        }
        clock::uptime_stamp(self.time.uptime_secs())
    }
}
