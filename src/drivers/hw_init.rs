//! One-shot board initialization.
//!
//! Claims every pin listed in [`crate::pins`], sets directions and pulls,
//! drives all outputs low and hands the result to the board adapter.
//! Called once from `main()` before the scheduler starts.

use core::fmt;

#[cfg(target_os = "espidf")]
use esp_idf_svc::hal::gpio::{AnyIOPin, AnyOutputPin, Input, Output, PinDriver, Pull};
#[cfg(target_os = "espidf")]
use log::info;

#[cfg(target_os = "espidf")]
use crate::adapters::hardware::{BoardInputs, BoardOutputs, GpioBoard};
#[cfg(target_os = "espidf")]
use crate::pins;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    /// Configuring GPIO `pin` failed with ESP-IDF return code `rc`.
    GpioConfigFailed { pin: i32, rc: i32 },
}

impl fmt::Display for HwInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GpioConfigFailed { pin, rc } => {
                write!(f, "GPIO{} config failed (rc={})", pin, rc)
            }
        }
    }
}

// ── ESP-IDF board ─────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub type EspInputPin = PinDriver<'static, AnyIOPin, Input>;
#[cfg(target_os = "espidf")]
pub type EspOutputPin = PinDriver<'static, AnyOutputPin, Output>;
/// The production board.
#[cfg(target_os = "espidf")]
pub type EspBoard = GpioBoard<EspInputPin, EspOutputPin>;

#[cfg(target_os = "espidf")]
fn input(pin: i32, pull: Pull) -> Result<EspInputPin, HwInitError> {
    let fail = |e: esp_idf_svc::sys::EspError| HwInitError::GpioConfigFailed { pin, rc: e.code() };
    // SAFETY: each pin number in `pins` is claimed exactly once, here.
    let mut driver = PinDriver::input(unsafe { AnyIOPin::new(pin) }).map_err(fail)?;
    driver.set_pull(pull).map_err(fail)?;
    Ok(driver)
}

#[cfg(target_os = "espidf")]
fn output(pin: i32) -> Result<EspOutputPin, HwInitError> {
    let fail = |e: esp_idf_svc::sys::EspError| HwInitError::GpioConfigFailed { pin, rc: e.code() };
    // SAFETY: each pin number in `pins` is claimed exactly once, here.
    let mut driver = PinDriver::output(unsafe { AnyOutputPin::new(pin) }).map_err(fail)?;
    driver.set_low().map_err(fail)?;
    Ok(driver)
}

/// Configure every board pin and build the board adapter.
#[cfg(target_os = "espidf")]
pub fn init_board() -> Result<EspBoard, HwInitError> {
    let inputs = BoardInputs {
        buzz_mode_switch: input(pins::SWITCH_BUZZ_MODE_GPIO, Pull::Up)?,
        ack_buzz_switch: input(pins::SWITCH_ACK_BUZZ_GPIO, Pull::Up)?,
        ack_switch: input(pins::SWITCH_ACK_GPIO, Pull::Up)?,
        // The opto-coupler carries its own pull-up.
        ring: input(pins::RING_INPUT_GPIO, Pull::Floating)?,
    };
    info!("hw_init: GPIO inputs configured");

    let [power, ack, spare, error, doorbell] = pins::LED_GPIOS;
    let outputs = BoardOutputs {
        leds: [
            output(power)?,
            output(ack)?,
            output(spare)?,
            output(error)?,
            output(doorbell)?,
        ],
        buzzer_relay: output(pins::BUZZER_RELAY_GPIO)?,
        ext_bell_relay: output(pins::EXT_BELL_RELAY_GPIO)?,
        heartbeat: output(pins::HEARTBEAT_LED_GPIO)?,
    };
    info!("hw_init: GPIO outputs configured");

    Ok(GpioBoard::new(inputs, outputs))
}
