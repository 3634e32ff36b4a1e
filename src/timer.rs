//! Tick-driven countdown timers.
//!
//! Every timer is advanced by its owner exactly once per tick via
//! `decrement()`. There is no wall-clock involved: durations are counted
//! in ticks of whatever loop drives them.
//!
//! - [`DurationTimer`] — one-shot gate, active while `remaining > 0`.
//! - [`EventTimer`] — periodic event, fires on the tick where
//!   `remaining == 0` and optionally re-arms itself.

/// Shared countdown core. `remaining == -1` means stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Countdown {
    duration: i32,
    remaining: i32,
}

impl Countdown {
    const fn new(duration_ticks: u32) -> Self {
        Self {
            duration: duration_ticks as i32,
            remaining: 0,
        }
    }

    fn start(&mut self) {
        self.remaining = self.duration;
    }

    fn stop(&mut self) {
        self.remaining = -1;
    }

    fn decrement(&mut self) {
        if self.remaining > -1 {
            self.remaining -= 1;
        }
    }
}

// ── DurationTimer ─────────────────────────────────────────────

/// One-shot duration gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationTimer(Countdown);

impl DurationTimer {
    pub const fn new(duration_ticks: u32) -> Self {
        Self(Countdown::new(duration_ticks))
    }

    pub fn start(&mut self) {
        self.0.start();
    }

    pub fn stop(&mut self) {
        self.0.stop();
    }

    pub fn decrement(&mut self) {
        self.0.decrement();
    }

    /// True while ticks remain in the current run.
    pub fn is_active(&self) -> bool {
        self.0.remaining > 0
    }

    pub fn remaining(&self) -> i32 {
        self.0.remaining
    }

    pub fn duration(&self) -> u32 {
        self.0.duration as u32
    }
}

// ── EventTimer ────────────────────────────────────────────────

/// Periodic event timer.
///
/// A freshly created timer sits at `remaining == 0`, so the first call to
/// [`fire_and_rearm`](Self::fire_and_rearm) fires immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventTimer {
    countdown: Countdown,
    auto_restart: bool,
}

impl EventTimer {
    pub const fn new(duration_ticks: u32, auto_restart: bool) -> Self {
        Self {
            countdown: Countdown::new(duration_ticks),
            auto_restart,
        }
    }

    pub fn start(&mut self) {
        self.countdown.start();
    }

    pub fn stop(&mut self) {
        self.countdown.stop();
    }

    /// Check for the fire instant, then advance one tick.
    ///
    /// Returns `true` iff `remaining` was `0` on entry. With auto-restart
    /// enabled the timer is re-armed to its full duration in the same call.
    pub fn fire_and_rearm(&mut self) -> bool {
        let fired = self.countdown.remaining == 0;
        self.countdown.decrement();
        if fired && self.auto_restart {
            self.countdown.start();
        }
        fired
    }

    pub fn remaining(&self) -> i32 {
        self.countdown.remaining
    }
}
