//! Time adapters.
//!
//! - [`SntpTime`] implements [`TimeSource`]: wall-clock time kept in sync by
//!   SNTP, plus monotonic uptime.
//! - [`SystemDelay`] implements `embedded_hal::delay::DelayNs` for the main
//!   loop period and the startup cycles.
//!
//! - **`target_os = "espidf"`**: `EspSntp` syncs the system clock in the
//!   background; uptime comes from `esp_timer_get_time()`; delays yield to
//!   FreeRTOS.
//! - **`not(target_os = "espidf")`**: the host clock, `std::time::Instant`
//!   and `std::thread::sleep`.

use std::time::{SystemTime, UNIX_EPOCH};

use embedded_hal::delay::DelayNs;
use log::{debug, info};

use crate::app::ports::{TimeSource, TimeSyncError};

#[cfg(target_os = "espidf")]
use esp_idf_svc::sntp::{EspSntp, SntpConf, SyncStatus};

/// SNTP-backed wall clock.
pub struct SntpTime {
    #[cfg(target_os = "espidf")]
    sntp: Option<EspSntp<'static>>,

    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
    /// Simulation: pinned Unix time, `Some(None)` for an unset clock.
    #[cfg(not(target_os = "espidf"))]
    sim_time: Option<Option<i64>>,
}

impl Default for SntpTime {
    fn default() -> Self {
        Self::new()
    }
}

impl SntpTime {
    pub fn new() -> Self {
        Self {
            #[cfg(target_os = "espidf")]
            sntp: None,
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
            #[cfg(not(target_os = "espidf"))]
            sim_time: None,
        }
    }

    /// Pin the clock (simulation only). `None` reads as never synced.
    #[cfg(not(target_os = "espidf"))]
    pub fn set_sim_time(&mut self, unix_secs: Option<i64>) {
        self.sim_time = Some(unix_secs);
    }

    fn system_unix_time() -> Option<i64> {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .ok()
            .and_then(|d| i64::try_from(d.as_secs()).ok())
    }
}

impl TimeSource for SntpTime {
    #[cfg(target_os = "espidf")]
    fn start_sync(&mut self, server: &str) -> Result<(), TimeSyncError> {
        let mut conf = SntpConf::default();
        conf.servers[0] = server;
        let sntp = EspSntp::new(&conf).map_err(|e| {
            log::warn!("SNTP: start failed: {}", e);
            TimeSyncError::Unavailable
        })?;
        info!("SNTP: syncing against {}", server);
        self.sntp = Some(sntp);
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn start_sync(&mut self, server: &str) -> Result<(), TimeSyncError> {
        info!("SNTP(sim): using host clock instead of {}", server);
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn refresh(&mut self) {
        if let Some(sntp) = self.sntp.as_ref() {
            if sntp.get_sync_status() == SyncStatus::Completed {
                debug!("SNTP: clock in sync");
            }
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn refresh(&mut self) {
        debug!("SNTP(sim): refresh");
    }

    #[cfg(target_os = "espidf")]
    fn unix_time(&self) -> Option<i64> {
        Self::system_unix_time()
    }

    #[cfg(not(target_os = "espidf"))]
    fn unix_time(&self) -> Option<i64> {
        match self.sim_time {
            Some(pinned) => pinned,
            None => Self::system_unix_time(),
        }
    }

    #[cfg(target_os = "espidf")]
    fn uptime_secs(&self) -> u64 {
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64 / 1_000_000
    }

    #[cfg(not(target_os = "espidf"))]
    fn uptime_secs(&self) -> u64 {
        self.start.elapsed().as_secs()
    }
}

/// Blocking delay for the main task.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemDelay;

impl DelayNs for SystemDelay {
    fn delay_ns(&mut self, ns: u32) {
        #[cfg(target_os = "espidf")]
        esp_idf_svc::hal::delay::Ets::delay_us(ns.div_ceil(1000));

        #[cfg(not(target_os = "espidf"))]
        std::thread::sleep(std::time::Duration::from_nanos(u64::from(ns)));
    }

    fn delay_ms(&mut self, ms: u32) {
        #[cfg(target_os = "espidf")]
        esp_idf_svc::hal::delay::FreeRtos::delay_ms(ms);

        #[cfg(not(target_os = "espidf"))]
        std::thread::sleep(std::time::Duration::from_millis(u64::from(ms)));
    }
}
