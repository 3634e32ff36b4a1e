//! Doorbell controller — the relay/LED/ack/reboot state machine.
//!
//! [`Controller`] owns every physical output and all of the doorbell's
//! business rules. It is driven once per tick by the scheduler and reports
//! what happened through an [`EventSink`]; hardware, storage and delays
//! arrive per call as a [`DeviceIo`] bundle.
//!
//! ```text
//!  switches / ring ──▶ ┌──────────────────────────┐ ──▶ EventSink
//!                      │        Controller         │
//!  relays / LEDs  ◀─── │ relays · ack · auto-buzz  │ ◀── ConfigPort
//!                      └──────────────────────────┘
//! ```
//!
//! ## Per-tick order
//!
//! 1. Toggle the blink phase.
//! 2. Sample the three switches and dispatch their rising edges.
//! 3. Sample the ring input; a rising edge rings.
//! 4. Arbitrate the relays and mirror `Running` onto the relay outputs.
//! 5. Render the LEDs.
//! 6. Decrement every timer once.
//! 7. Report whether a pending reboot is due.

use log::{info, warn};

use crate::config::{ControllerConfig, STARTUP_CYCLE_MS, Timing};
use crate::drivers::debounce::DebouncedInput;
use crate::drivers::status_leds::{self, IndicatorState, StartupSweep};
use crate::timer::DurationTimer;

use super::ports::{ConfigPort, DeviceIo, EventSink, Input, Relay, WallClock};
use super::relay::{self, RelaySlot, RelayState};

/// Outcome of one controller tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerStatus {
    Running,
    /// A reboot was requested and its grace period has elapsed.
    RestartDue,
}

pub struct Controller {
    config: ControllerConfig,
    ring_active: bool,

    bell: RelaySlot,
    buzzer: RelaySlot,

    bell_blink: DurationTimer,
    ack_led: DurationTimer,
    error_led: DurationTimer,
    reboot_timer: DurationTimer,
    reboot_pending: bool,

    blink_phase: bool,
    sweep: StartupSweep,

    buzz_mode_switch: DebouncedInput,
    ack_buzz_switch: DebouncedInput,
    ack_switch: DebouncedInput,
    ring_input: DebouncedInput,
}

impl Controller {
    pub fn new(timing: &Timing) -> Self {
        Self {
            config: ControllerConfig::default(),
            ring_active: false,
            bell: RelaySlot::new(timing.ext_bell_ticks),
            buzzer: RelaySlot::new(timing.door_open_ticks),
            bell_blink: DurationTimer::new(timing.bell_blink_ticks),
            ack_led: DurationTimer::new(timing.ack_led_ticks),
            error_led: DurationTimer::new(timing.error_led_ticks),
            reboot_timer: DurationTimer::new(timing.reboot_wait_ticks),
            reboot_pending: false,
            blink_phase: false,
            sweep: StartupSweep::new(),
            buzz_mode_switch: DebouncedInput::new(timing.switch_debounce_ticks),
            ack_buzz_switch: DebouncedInput::new(timing.switch_debounce_ticks),
            ack_switch: DebouncedInput::new(timing.switch_debounce_ticks),
            ring_input: DebouncedInput::new(timing.ring_debounce_ticks).with_raw_capture(),
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Load the persisted config and drive every output to a known state.
    ///
    /// A storage fault is logged and the default config is used.
    pub fn setup(&mut self, io: &mut DeviceIo<'_>) {
        match io.storage.load() {
            Ok(config) => self.config = config,
            Err(e) => {
                warn!("Controller: config load failed ({}), using defaults", e);
                self.config = ControllerConfig::default();
            }
        }
        info!("Controller: auto-buzz {}", on_off(self.config.auto_buzz));

        io.board.set_relay(Relay::Buzzer, false);
        io.board.set_relay(Relay::ExtBell, false);
        status_leds::LedFrame::default().write_to(&mut *io.board);
        io.board.set_heartbeat(false);
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one normal-loop cycle. See the module docs for the order.
    pub fn tick(
        &mut self,
        io: &mut DeviceIo<'_>,
        events: &mut dyn EventSink,
        clock: &dyn WallClock,
    ) -> ControllerStatus {
        self.blink_phase = !self.blink_phase;

        self.read_switches(io, events, clock);

        let raw_ring = io.board.is_active(Input::Ring);
        if self.ring_input.poll(raw_ring, clock) {
            self.ring(false, events);
        }

        relay::arbitrate(&mut self.bell, &mut self.buzzer);
        io.board.set_relay(Relay::Buzzer, self.buzzer.is_energized());
        io.board.set_relay(Relay::ExtBell, self.bell.is_energized());

        io.board.set_heartbeat(true);
        status_leds::render(&self.indicator_state()).write_to(&mut *io.board);

        self.decrement_timers();

        if self.reboot_pending && !self.reboot_timer.is_active() {
            ControllerStatus::RestartDue
        } else {
            ControllerStatus::Running
        }
    }

    /// One blocking startup cycle: wait, toggle the heartbeat, and light
    /// the next LED of the sweep.
    pub fn startup_cycle(&mut self, io: &mut DeviceIo<'_>) {
        self.blink_phase = !self.blink_phase;

        io.delay.delay_ms(STARTUP_CYCLE_MS);

        io.board.set_heartbeat(self.blink_phase);
        self.sweep.advance().write_to(&mut *io.board);

        self.decrement_timers();
    }

    /// Block for roughly `secs` seconds of startup cycles.
    pub fn wait_seconds(&mut self, secs: u32, io: &mut DeviceIo<'_>) {
        let cycles = secs * 1000 / STARTUP_CYCLE_MS;
        for _ in 0..cycles {
            self.startup_cycle(io);
        }
    }

    // ── Operations ────────────────────────────────────────────

    /// Register a ring. `test` marks rings triggered remotely.
    pub fn ring(&mut self, test: bool, events: &mut dyn EventSink) {
        info!("Controller: {} detected", if test { "test ring" } else { "ring" });
        self.ring_active = true;
        events.on_ring(test, self.config.auto_buzz);
        self.bell.schedule();
        self.bell_blink.start();

        if self.config.auto_buzz {
            self.buzzer.schedule();
        }
    }

    /// Open the door.
    pub fn buzz(&mut self, events: &mut dyn EventSink) {
        self.buzzer.schedule();
        events.on_buzz(self.config.auto_buzz);
    }

    /// Change auto-buzz. Storage is written only when the value changes.
    pub fn set_auto_buzz(
        &mut self,
        enabled: bool,
        storage: &mut dyn ConfigPort,
        events: &mut dyn EventSink,
    ) {
        let changed = enabled != self.config.auto_buzz;
        self.config.auto_buzz = enabled;
        events.on_auto_buzz_changed(enabled);

        if changed {
            info!("Controller: auto-buzz {}", on_off(enabled));
            if let Err(e) = storage.save(&self.config) {
                warn!("Controller: failed to persist auto-buzz: {}", e);
            }
        }
    }

    pub fn ack_ring(&mut self, events: &mut dyn EventSink) {
        self.ring_active = false;
        events.on_ring_acknowledged();
        self.ack_led.start();
        self.bell_blink.stop();
    }

    /// Ack switch. Without an active ring only the error LED lights.
    pub fn ack_via_button(&mut self, events: &mut dyn EventSink) {
        if !self.ring_active {
            self.error_led.start();
            return;
        }
        self.ack_ring(events);
    }

    /// Ack+buzz switch. Skips the buzz when auto-buzz already opened the door.
    pub fn ack_and_buzz_via_button(&mut self, events: &mut dyn EventSink) {
        if !self.ring_active {
            self.error_led.start();
            return;
        }
        self.ack_ring(events);
        if !self.config.auto_buzz {
            self.buzz(events);
        }
    }

    /// Request a restart after the reboot grace period. Idempotent.
    pub fn reboot(&mut self) {
        if self.reboot_pending {
            return;
        }
        info!("Controller: reboot requested");
        self.reboot_pending = true;
        self.reboot_timer.start();
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn auto_buzz(&self) -> bool {
        self.config.auto_buzz
    }

    pub fn ring_active(&self) -> bool {
        self.ring_active
    }

    pub fn bell_state(&self) -> RelayState {
        self.bell.state()
    }

    pub fn buzzer_state(&self) -> RelayState {
        self.buzzer.state()
    }

    pub fn reboot_pending(&self) -> bool {
        self.reboot_pending
    }

    pub fn bell_blink_active(&self) -> bool {
        self.bell_blink.is_active()
    }

    pub fn ack_led_active(&self) -> bool {
        self.ack_led.is_active()
    }

    pub fn error_led_active(&self) -> bool {
        self.error_led.is_active()
    }

    /// Archived raw ring windows followed by the open one, oldest first.
    pub fn raw_data_lines(&self, clock: &dyn WallClock) -> Vec<String> {
        self.ring_input.raw_data_lines(clock)
    }

    pub fn indicator_state(&self) -> IndicatorState {
        IndicatorState {
            blink_phase: self.blink_phase,
            ack_timer_active: self.ack_led.is_active(),
            auto_buzz: self.config.auto_buzz,
            reboot_pending: self.reboot_pending,
            error_timer_active: self.error_led.is_active(),
            bell_blink_active: self.bell_blink.is_active(),
            ring_active: self.ring_active,
        }
    }

    // ── Internals ─────────────────────────────────────────────

    fn read_switches(
        &mut self,
        io: &mut DeviceIo<'_>,
        events: &mut dyn EventSink,
        clock: &dyn WallClock,
    ) {
        let raw = io.board.is_active(Input::BuzzModeSwitch);
        if self.buzz_mode_switch.poll(raw, clock) {
            let enabled = !self.config.auto_buzz;
            self.set_auto_buzz(enabled, &mut *io.storage, events);
        }

        let raw = io.board.is_active(Input::AckBuzzSwitch);
        if self.ack_buzz_switch.poll(raw, clock) {
            self.ack_and_buzz_via_button(events);
        }

        let raw = io.board.is_active(Input::AckSwitch);
        if self.ack_switch.poll(raw, clock) {
            self.ack_via_button(events);
        }
    }

    fn decrement_timers(&mut self) {
        self.ack_led.decrement();
        self.error_led.decrement();
        self.buzzer.decrement();
        self.bell.decrement();
        self.bell_blink.decrement();
        self.reboot_timer.decrement();
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled { "on" } else { "off" }
}
