//! Status LED rendering.
//!
//! Turns controller state into on/off levels for the five front-panel
//! LEDs. All blinking derives from one shared phase bit that the
//! controller toggles every tick.
//!
//! ## Rules (highest priority first, per LED)
//!
//! | LED         | Condition                 | Output              |
//! |-------------|---------------------------|---------------------|
//! | Power       | always                    | on                  |
//! | Ack/auto    | ack timer active          | on                  |
//! |             | auto-buzz enabled         | phase               |
//! | Error       | reboot pending            | phase               |
//! |             | error timer active        | on                  |
//! | Doorbell    | bell-blink timer active   | inverted phase      |
//! |             | ring active               | on                  |
//! | Spare       | —                         | off                 |
//!
//! During startup a separate sweep lights exactly one LED per cycle.

use crate::app::ports::{Led, OutputPort};

/// Snapshot of the state the LEDs depend on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndicatorState {
    pub blink_phase: bool,
    pub ack_timer_active: bool,
    pub auto_buzz: bool,
    pub reboot_pending: bool,
    pub error_timer_active: bool,
    pub bell_blink_active: bool,
    pub ring_active: bool,
}

/// One level per LED.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedFrame {
    pub power: bool,
    pub ack_auto_buzz: bool,
    pub spare: bool,
    pub error: bool,
    pub doorbell: bool,
}

impl LedFrame {
    pub fn level(&self, led: Led) -> bool {
        match led {
            Led::Power => self.power,
            Led::AckAutoBuzz => self.ack_auto_buzz,
            Led::Spare => self.spare,
            Led::Error => self.error,
            Led::Doorbell => self.doorbell,
        }
    }

    /// Frame with only `lit` on.
    pub fn single(lit: Led) -> Self {
        let mut frame = Self::default();
        match lit {
            Led::Power => frame.power = true,
            Led::AckAutoBuzz => frame.ack_auto_buzz = true,
            Led::Spare => frame.spare = true,
            Led::Error => frame.error = true,
            Led::Doorbell => frame.doorbell = true,
        }
        frame
    }

    pub fn write_to<O: OutputPort + ?Sized>(&self, out: &mut O) {
        for led in Led::ALL {
            out.set_led(led, self.level(led));
        }
    }
}

/// Normal-loop rendering.
pub fn render(state: &IndicatorState) -> LedFrame {
    let phase = state.blink_phase;

    let ack_auto_buzz = if state.ack_timer_active {
        true
    } else {
        state.auto_buzz && phase
    };

    let error = if state.reboot_pending {
        phase
    } else {
        state.error_timer_active
    };

    let doorbell = if state.bell_blink_active {
        !phase
    } else {
        state.ring_active
    };

    LedFrame {
        power: true,
        ack_auto_buzz,
        spare: false,
        error,
        doorbell,
    }
}

// ── Startup sweep ─────────────────────────────────────────────

/// Cursor for the startup LED sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StartupSweep {
    cursor: usize,
}

impl StartupSweep {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frame for this cycle; advances to the next LED, wrapping.
    pub fn advance(&mut self) -> LedFrame {
        let frame = LedFrame::single(Led::ALL[self.cursor]);
        self.cursor = (self.cursor + 1) % Led::ALL.len();
        frame
    }

    pub fn current(&self) -> Led {
        Led::ALL[self.cursor]
    }
}
