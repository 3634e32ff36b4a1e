//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements [`ConfigPort`] for the controller configuration. The whole
//! configuration is the auto-buzz flag, stored as one postcard byte
//! (`0`/`1`) under `doorbell::autobuzz`.
//!
//! - ESP-IDF: raw `nvs_*` calls on the default NVS partition.
//! - Host: an in-memory map, so tests can inspect and corrupt the bytes.

use crate::app::ports::{ConfigError, ConfigPort};
use crate::config::ControllerConfig;
use log::{info, warn};

#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

const CONFIG_NAMESPACE: &str = "doorbell";
const CONFIG_KEY: &str = "autobuzz";

#[cfg(target_os = "espidf")]
const MAX_BLOB_SIZE: usize = 16;

pub struct NvsAdapter {
    /// Flash initialised; every access fails with `IoError` otherwise.
    ready: bool,
    #[cfg(not(target_os = "espidf"))]
    store: HashMap<String, Vec<u8>>,
}

impl NvsAdapter {
    /// Create the adapter and initialise NVS flash.
    ///
    /// On first boot or after a layout change the partition is erased and
    /// re-initialised.
    pub fn new() -> Result<Self, ConfigError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: called once from the main task before any other NVS use.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES || ret == ESP_ERR_NVS_NEW_VERSION_FOUND {
                warn!("NVS: erasing and re-initialising flash partition");
                if unsafe { nvs_flash_erase() } != ESP_OK {
                    return Err(ConfigError::IoError);
                }
                if unsafe { nvs_flash_init() } != ESP_OK {
                    return Err(ConfigError::IoError);
                }
            } else if ret != ESP_OK {
                return Err(ConfigError::IoError);
            }
            info!("NVS: flash initialised");
        }

        #[cfg(not(target_os = "espidf"))]
        info!("NVS: simulation backend");

        Ok(Self {
            ready: true,
            #[cfg(not(target_os = "espidf"))]
            store: HashMap::new(),
        })
    }

    /// An adapter without backing flash, for boots where NVS init failed.
    pub fn unavailable() -> Self {
        Self {
            ready: false,
            #[cfg(not(target_os = "espidf"))]
            store: HashMap::new(),
        }
    }

    fn ensure_ready(&self) -> Result<(), ConfigError> {
        if self.ready {
            Ok(())
        } else {
            Err(ConfigError::IoError)
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn composite_key(namespace: &str, key: &str) -> String {
        format!("{}::{}", namespace, key)
    }

    /// Raw stored bytes (simulation only).
    #[cfg(not(target_os = "espidf"))]
    pub fn raw(&self) -> Option<&[u8]> {
        self.store
            .get(&Self::composite_key(CONFIG_NAMESPACE, CONFIG_KEY))
            .map(Vec::as_slice)
    }

    /// Overwrite the stored bytes (simulation only).
    #[cfg(not(target_os = "espidf"))]
    pub fn set_raw(&mut self, bytes: &[u8]) {
        self.store.insert(
            Self::composite_key(CONFIG_NAMESPACE, CONFIG_KEY),
            bytes.to_vec(),
        );
    }

    /// Open an NVS namespace, run `f` with the handle, then close it.
    #[cfg(target_os = "espidf")]
    fn with_nvs_handle<F, T>(namespace: &str, write: bool, f: F) -> Result<T, i32>
    where
        F: FnOnce(nvs_handle_t) -> Result<T, i32>,
    {
        let mut ns_buf = [0u8; 16];
        let ns_bytes = namespace.as_bytes();
        let len = ns_bytes.len().min(15);
        ns_buf[..len].copy_from_slice(&ns_bytes[..len]);

        let mut handle: nvs_handle_t = 0;
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };

        let ret = unsafe { nvs_open(ns_buf.as_ptr() as *const _, mode, &mut handle) };
        if ret != ESP_OK {
            return Err(ret);
        }

        let result = f(handle);
        unsafe {
            nvs_close(handle);
        }
        result
    }
}

/// Stored bytes to config. Anything but a valid postcard flag is corrupt.
fn decode_config(bytes: &[u8]) -> Result<ControllerConfig, ConfigError> {
    postcard::from_bytes(bytes).map_err(|_| ConfigError::Corrupted)
}

impl ConfigPort for NvsAdapter {
    fn load(&self) -> Result<ControllerConfig, ConfigError> {
        self.ensure_ready()?;

        #[cfg(not(target_os = "espidf"))]
        {
            match self.raw() {
                Some(bytes) => {
                    let cfg = decode_config(bytes)?;
                    info!("NVS: loaded config from store");
                    Ok(cfg)
                }
                None => {
                    info!("NVS: no stored config, using defaults");
                    Ok(ControllerConfig::default())
                }
            }
        }

        #[cfg(target_os = "espidf")]
        {
            let result = Self::with_nvs_handle(CONFIG_NAMESPACE, false, |handle| {
                let key_cstr = b"autobuzz\0";
                let mut buf = [0u8; MAX_BLOB_SIZE];
                let mut size = buf.len();
                let ret = unsafe {
                    nvs_get_blob(
                        handle,
                        key_cstr.as_ptr() as *const _,
                        buf.as_mut_ptr() as *mut _,
                        &mut size,
                    )
                };
                if ret != ESP_OK {
                    return Err(ret);
                }
                Ok(buf[..size].to_vec())
            });

            match result {
                Ok(bytes) => {
                    let cfg = decode_config(&bytes)?;
                    info!("NVS: loaded config ({} bytes)", bytes.len());
                    Ok(cfg)
                }
                Err(e) if e == ESP_ERR_NVS_NOT_FOUND => {
                    info!("NVS: no stored config, using defaults");
                    Ok(ControllerConfig::default())
                }
                Err(e) => {
                    warn!("NVS: read error {}", e);
                    Err(ConfigError::IoError)
                }
            }
        }
    }

    fn save(&mut self, config: &ControllerConfig) -> Result<(), ConfigError> {
        self.ensure_ready()?;
        let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::IoError)?;

        #[cfg(not(target_os = "espidf"))]
        {
            self.set_raw(&bytes);
            info!("NVS: config saved (simulation)");
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            let result = Self::with_nvs_handle(CONFIG_NAMESPACE, true, |handle| {
                let key_cstr = b"autobuzz\0";
                let ret = unsafe {
                    nvs_set_blob(
                        handle,
                        key_cstr.as_ptr() as *const _,
                        bytes.as_ptr() as *const _,
                        bytes.len(),
                    )
                };
                if ret != ESP_OK {
                    return Err(ret);
                }
                let ret = unsafe { nvs_commit(handle) };
                if ret != ESP_OK {
                    return Err(ret);
                }
                Ok(())
            });
            match result {
                Ok(()) => {
                    info!("NVS: config saved ({} bytes)", bytes.len());
                    Ok(())
                }
                Err(e) => {
                    warn!("NVS: write error {}", e);
                    Err(ConfigError::IoError)
                }
            }
        }
    }
}
