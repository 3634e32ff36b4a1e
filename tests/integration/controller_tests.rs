//! Controller driven through the board ports: debounced inputs in,
//! relays and LEDs out.

use crate::mock_hw::{CountingDelay, FixedClock, MockBoard, MockNvs, Recorded, RecordingSink};

use doorbell::app::controller::{Controller, ControllerStatus};
use doorbell::app::ports::{DeviceIo, Input, Led, Relay};
use doorbell::app::relay::RelayState;
use doorbell::config::{ControllerConfig, Timing};

const NOW: &str = "2024-05-01 12:00:00";

struct Bench {
    ctl: Controller,
    board: MockBoard,
    nvs: MockNvs,
    delay: CountingDelay,
    sink: RecordingSink,
}

impl Bench {
    fn new(nvs: MockNvs) -> Self {
        let mut bench = Self {
            ctl: Controller::new(&Timing::default()),
            board: MockBoard::new(),
            nvs,
            delay: CountingDelay::default(),
            sink: RecordingSink::default(),
        };
        let mut io = DeviceIo {
            board: &mut bench.board,
            storage: &mut bench.nvs,
            delay: &mut bench.delay,
        };
        bench.ctl.setup(&mut io);
        bench
    }

    fn tick(&mut self) -> ControllerStatus {
        let mut io = DeviceIo {
            board: &mut self.board,
            storage: &mut self.nvs,
            delay: &mut self.delay,
        };
        self.ctl.tick(&mut io, &mut self.sink, &FixedClock(NOW))
    }

    fn ticks(&mut self, n: usize) {
        for _ in 0..n {
            self.tick();
        }
    }

    /// Hold `input` long enough to commit, then release it.
    fn press(&mut self, input: Input) {
        self.board.set_input(input, true);
        self.ticks(2);
        self.board.set_input(input, false);
        self.ticks(2);
    }
}

#[test]
fn ring_input_runs_bell_and_leaves_buzzer_idle() {
    let mut b = Bench::new(MockNvs::default());
    b.board.set_input(Input::Ring, true);

    b.ticks(4);
    assert_eq!(b.ctl.bell_state(), RelayState::Idle);
    assert!(b.sink.events.is_empty());

    b.tick();
    assert_eq!(b.ctl.bell_state(), RelayState::Running);
    assert_eq!(b.ctl.buzzer_state(), RelayState::Idle);
    assert!(b.board.relay(Relay::ExtBell));
    assert!(!b.board.relay(Relay::Buzzer));
    assert_eq!(
        b.sink.events,
        vec![Recorded::Ring {
            test: false,
            auto_buzz: false
        }]
    );
}

#[test]
fn remote_ring_is_scheduled_then_runs_on_next_tick() {
    let mut b = Bench::new(MockNvs::default());
    b.ctl.ring(true, &mut b.sink);
    assert_eq!(b.ctl.bell_state(), RelayState::Scheduled);
    assert!(!b.board.relay(Relay::ExtBell));

    b.tick();
    assert_eq!(b.ctl.bell_state(), RelayState::Running);
    assert_eq!(b.ctl.buzzer_state(), RelayState::Idle);
}

#[test]
fn auto_buzz_ring_runs_bell_then_buzzer_never_both() {
    let mut b = Bench::new(MockNvs::with(ControllerConfig { auto_buzz: true }));
    b.ctl.ring(false, &mut b.sink);

    let (mut bell_ticks, mut buzzer_ticks) = (0, 0);
    for _ in 0..80 {
        b.tick();
        bell_ticks += usize::from(b.board.relay(Relay::ExtBell));
        buzzer_ticks += usize::from(b.board.relay(Relay::Buzzer));
    }

    assert_eq!(bell_ticks, 10);
    assert_eq!(buzzer_ticks, 50);
    assert!(!b.board.relays_overlapped);
    assert_eq!(b.ctl.bell_state(), RelayState::Idle);
    assert_eq!(b.ctl.buzzer_state(), RelayState::Idle);
}

#[test]
fn ack_without_ring_only_lights_error_led() {
    let mut b = Bench::new(MockNvs::default());
    b.board.set_input(Input::AckSwitch, true);
    b.ticks(2);
    assert!(b.board.led(Led::Error));
    assert!(b.sink.events.is_empty());

    b.board.set_input(Input::AckSwitch, false);
    b.ticks(12);
    assert!(!b.board.led(Led::Error));
}

#[test]
fn ack_switch_acknowledges_ring() {
    let mut b = Bench::new(MockNvs::default());
    b.ctl.ring(false, &mut b.sink);
    b.tick();
    assert!(b.ctl.bell_blink_active());

    b.press(Input::AckSwitch);
    assert!(!b.ctl.ring_active());
    assert!(!b.ctl.bell_blink_active());
    assert!(b.ctl.ack_led_active());
    assert!(b.board.led(Led::AckAutoBuzz));
    assert_eq!(b.sink.events.last(), Some(&Recorded::Ack));
    assert_eq!(b.ctl.buzzer_state(), RelayState::Idle);
}

#[test]
fn ack_buzz_switch_opens_door_in_manual_mode() {
    let mut b = Bench::new(MockNvs::default());
    b.ctl.ring(false, &mut b.sink);
    b.press(Input::AckBuzzSwitch);

    assert!(b.sink.events.contains(&Recorded::Ack));
    assert!(b.sink.events.contains(&Recorded::Buzz { auto: false }));
    assert_ne!(b.ctl.buzzer_state(), RelayState::Idle);
}

#[test]
fn buzz_mode_switch_toggles_and_persists_once_per_change() {
    let mut b = Bench::new(MockNvs::default());
    b.press(Input::BuzzModeSwitch);
    assert!(b.ctl.auto_buzz());
    assert_eq!(b.nvs.stored, Some(ControllerConfig { auto_buzz: true }));
    assert_eq!(b.nvs.writes, 1);

    b.press(Input::BuzzModeSwitch);
    assert!(!b.ctl.auto_buzz());
    assert_eq!(b.nvs.writes, 2);
    assert_eq!(
        b.sink.events,
        vec![Recorded::AutoBuzz(true), Recorded::AutoBuzz(false)]
    );
}

#[test]
fn held_switch_fires_once() {
    let mut b = Bench::new(MockNvs::default());
    b.board.set_input(Input::BuzzModeSwitch, true);
    b.ticks(30);
    assert_eq!(b.nvs.writes, 1);
}

#[test]
fn reboot_is_due_after_grace_period_and_not_extended() {
    let mut b = Bench::new(MockNvs::default());
    b.ctl.reboot();

    let mut error_led = Vec::new();
    for i in 1..20 {
        if i == 10 {
            b.ctl.reboot();
        }
        assert_eq!(b.tick(), ControllerStatus::Running, "tick {i}");
        error_led.push(b.board.led(Led::Error));
    }
    assert_eq!(b.tick(), ControllerStatus::RestartDue);
    assert!(error_led.contains(&true) && error_led.contains(&false));
}

#[test]
fn startup_wait_sweeps_leds_and_blocks() {
    let mut b = Bench::new(MockNvs::default());
    let mut io = DeviceIo {
        board: &mut b.board,
        storage: &mut b.nvs,
        delay: &mut b.delay,
    };
    b.ctl.wait_seconds(3, &mut io);

    assert_eq!(b.delay.total_ms(), 3000);
    // 15 cycles over 5 LEDs ends on the last one.
    assert!(b.board.led(Led::Doorbell));
    assert!(!b.board.led(Led::Power));
}

#[test]
fn raw_window_is_visible_mid_capture_then_archived() {
    let mut b = Bench::new(MockNvs::default());
    for level in [true, true, false] {
        b.board.set_input(Input::Ring, level);
        b.tick();
    }
    assert_eq!(
        b.ctl.raw_data_lines(&FixedClock(NOW)),
        vec![format!("{NOW} 110")]
    );

    b.ticks(97);
    let expected = format!("{NOW} 110{}", "0".repeat(97));
    assert_eq!(b.ctl.raw_data_lines(&FixedClock(NOW)), vec![expected]);
}
