//! Relay state machines and mutual-exclusion arbitration.
//!
//! The buzzer and the external bell share one supply that cannot carry
//! both coils at once, so at most one relay is ever `Running`.
//!
//! ```text
//!   Idle ──schedule()──▶ Scheduled ──arbitrate()──▶ Running
//!    ▲                                                 │
//!    └─────────────── on-time elapsed ─────────────────┘
//! ```

use crate::timer::DurationTimer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RelayState {
    #[default]
    Idle,
    Scheduled,
    Running,
}

/// One relay: its state plus the timer bounding its on-time.
#[derive(Debug, Clone)]
pub struct RelaySlot {
    state: RelayState,
    timer: DurationTimer,
}

impl RelaySlot {
    pub fn new(on_ticks: u32) -> Self {
        Self {
            state: RelayState::Idle,
            timer: DurationTimer::new(on_ticks),
        }
    }

    /// Request the relay. Only an idle relay moves; repeated requests
    /// while scheduled or running are absorbed.
    pub fn schedule(&mut self) {
        if self.state == RelayState::Idle {
            self.state = RelayState::Scheduled;
        }
    }

    pub fn state(&self) -> RelayState {
        self.state
    }

    pub fn is_energized(&self) -> bool {
        self.state == RelayState::Running
    }

    pub fn decrement(&mut self) {
        self.timer.decrement();
    }

    fn promote(&mut self) {
        self.state = RelayState::Running;
        self.timer.start();
    }

    fn expire(&mut self) {
        if self.state == RelayState::Running && !self.timer.is_active() {
            self.state = RelayState::Idle;
        }
    }
}

/// Promote at most one scheduled relay, then retire expired ones.
///
/// The bell is considered first, so it wins when both are scheduled.
pub fn arbitrate(bell: &mut RelaySlot, buzzer: &mut RelaySlot) {
    if bell.state == RelayState::Scheduled && buzzer.state != RelayState::Running {
        bell.promote();
    } else if buzzer.state == RelayState::Scheduled && bell.state != RelayState::Running {
        buzzer.promote();
    }

    bell.expire();
    buzzer.expire();
}
