//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements          | Connects to                 |
//! |------------|---------------------|-----------------------------|
//! | `hardware` | InputPort           | GPIO inputs (active-low)    |
//! |            | OutputPort          | LED and relay GPIO outputs  |
//! | `nvs`      | ConfigPort          | NVS / in-memory store       |
//! | `time`     | TimeSource          | SNTP + system timer         |
//! |            | DelayNs             | FreeRTOS delay / sleep      |
//! | `wifi`     | ConnectivityPort    | ESP-IDF WiFi STA            |
//!
//! The broker (`MessageBus`) lives in [`crate::mqtt`].

pub mod hardware;
pub mod nvs;
pub mod time;
pub mod wifi;
