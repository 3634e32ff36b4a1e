//! Doorbell broker firmware: main entry point.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  GpioBoard         NvsAdapter     WifiAdapter    SntpTime      │
//! │  (Input+Output)    (ConfigPort)   (Connectivity) (TimeSource)  │
//! │  LocalBroker       SystemDelay    SystemRestart                │
//! │  (MessageBus)      (DelayNs)      (RestartPort)                │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │  Controller · NetworkManager · ProtocolHandler         │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  Scheduler (100 ms main loop)                                  │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use log::{info, warn};

use doorbell::adapters::nvs::NvsAdapter;
use doorbell::adapters::time::{SntpTime, SystemDelay};
use doorbell::adapters::wifi::WifiAdapter;
use doorbell::config::{NetworkConfig, Timing};
use doorbell::drivers::hw_init;
use doorbell::drivers::restart::SystemRestart;
use doorbell::mqtt::LocalBroker;
use doorbell::scheduler::Scheduler;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  Doorbell broker v{}                ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Board pins ─────────────────────────────────────────
    let board = hw_init::init_board().map_err(doorbell::Error::from)?;

    // ── 3. Persistent config store ────────────────────────────
    let storage = match NvsAdapter::new() {
        Ok(n) => n,
        Err(e) => {
            // Loads will fail and fall back to defaults.
            warn!("NVS init failed ({}), auto-buzz will not persist", e);
            NvsAdapter::unavailable()
        }
    };

    // ── 4. Network stack ──────────────────────────────────────
    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs_partition = EspDefaultNvsPartition::take().ok();
    let wifi = WifiAdapter::new(peripherals.modem, sysloop, nvs_partition)?;

    let network_config = NetworkConfig::from_build_env();
    if network_config.credentials.is_empty() {
        warn!("No WiFi credentials baked in (set DOORBELL_WIFI_SSID at build time)");
    }
    let broker = LocalBroker::new(network_config.broker_port, network_config.broker_max_clients);

    // ── 5. Scheduler ──────────────────────────────────────────
    let timing = Timing::default();
    let mut scheduler = Scheduler::new(
        network_config,
        &timing,
        wifi,
        SntpTime::new(),
        broker,
        board,
        storage,
        SystemDelay,
        SystemRestart::new(),
    );

    scheduler.setup();
    scheduler.run()
}
