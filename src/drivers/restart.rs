//! Device restart.
//!
//! On ESP-IDF this is `esp_restart()`, which never returns. On the host
//! the request is logged and latched so tests can observe it.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::esp_restart;
use log::warn;

use crate::app::ports::RestartPort;

#[derive(Debug, Default)]
pub struct SystemRestart {
    #[cfg(not(target_os = "espidf"))]
    requested: u32,
}

impl SystemRestart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of restarts requested so far (simulation only).
    #[cfg(not(target_os = "espidf"))]
    pub fn requested(&self) -> u32 {
        self.requested
    }
}

impl RestartPort for SystemRestart {
    fn restart(&mut self) {
        warn!("Rebooting...");

        #[cfg(target_os = "espidf")]
        // SAFETY: no preconditions; the call does not return.
        unsafe {
            esp_restart();
        }

        #[cfg(not(target_os = "espidf"))]
        {
            self.requested += 1;
        }
    }
}
