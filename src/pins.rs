//! GPIO pin assignments for the doorbell controller board.
//!
//! Every driver references this module rather than hard-coding pin numbers.
//! Switches and the ring input are active-low: the switch switches to ground,
//! the ring opto-coupler pulls its line low while the intercom rings.

// ---------------------------------------------------------------------------
// Status LEDs (active HIGH)
// ---------------------------------------------------------------------------

/// Built-in LED, toggled every tick as proof of life.
pub const HEARTBEAT_LED_GPIO: i32 = 13;
/// On whenever the main loop runs.
pub const POWER_LED_GPIO: i32 = 2;
/// Ack flash, otherwise mirrors auto-buzz.
pub const ACK_AUTO_BUZZ_LED_GPIO: i32 = 3;
/// Unused on the current board, still part of the startup sweep.
pub const SPARE_LED_GPIO: i32 = 4;
pub const ERROR_LED_GPIO: i32 = 5;
/// Blinks after a ring until acknowledged.
pub const DOORBELL_LED_GPIO: i32 = 6;

/// LED pins in startup-sweep order.
pub const LED_GPIOS: [i32; 5] = [
    POWER_LED_GPIO,
    ACK_AUTO_BUZZ_LED_GPIO,
    SPARE_LED_GPIO,
    ERROR_LED_GPIO,
    DOORBELL_LED_GPIO,
];

// ---------------------------------------------------------------------------
// Front-panel switches (active LOW, internal pull-up)
// ---------------------------------------------------------------------------

pub const SWITCH_BUZZ_MODE_GPIO: i32 = 7;
pub const SWITCH_ACK_BUZZ_GPIO: i32 = 8;
pub const SWITCH_ACK_GPIO: i32 = 9;

// ---------------------------------------------------------------------------
// Intercom
// ---------------------------------------------------------------------------

/// Ring sense input (active LOW, external pull-up on the opto-coupler).
pub const RING_INPUT_GPIO: i32 = 10;
/// Door opener relay (active HIGH).
pub const BUZZER_RELAY_GPIO: i32 = 11;
/// External bell relay (active HIGH).
pub const EXT_BELL_RELAY_GPIO: i32 = 12;
