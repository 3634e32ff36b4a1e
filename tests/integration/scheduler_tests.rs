//! Whole device on the host: simulated WiFi and clock, the real local
//! broker, mock board and storage. Commands arrive from a TCP client the
//! way a phone app would send them.

use std::time::Duration;

use crate::mock_hw::{CountingDelay, MockBoard, MockNvs, MockRestart, TestClient};

use doorbell::adapters::time::SntpTime;
use doorbell::adapters::wifi::WifiAdapter;
use doorbell::app::controller::ControllerStatus;
use doorbell::app::ports::{Input, Relay};
use doorbell::app::relay::RelayState;
use doorbell::config::{ControllerConfig, NetworkConfig, Timing, WifiCredential};
use doorbell::mqtt::LocalBroker;
use doorbell::scheduler::Scheduler;

type Device =
    Scheduler<LocalBroker, WifiAdapter, SntpTime, MockBoard, MockNvs, CountingDelay, MockRestart>;

/// 2024-01-15 12:00:00 UTC, 13:00:00 local.
const NOON: i64 = 1_705_320_000;
const NOON_LOCAL: &str = "2024-01-15 13:00:00";

fn device(nvs: MockNvs, clock: Option<i64>) -> Device {
    let mut network = NetworkConfig {
        broker_port: 0,
        ..NetworkConfig::default()
    };
    network.add_credential("Home", "password1");

    let mut wifi = WifiAdapter::new();
    wifi.add_sim_network(WifiCredential::new("Home", "password1").unwrap());
    let mut time = SntpTime::new();
    time.set_sim_time(clock);

    let mut dev = Scheduler::new(
        network,
        &Timing::default(),
        wifi,
        time,
        LocalBroker::new(0, 4),
        MockBoard::new(),
        nvs,
        CountingDelay::default(),
        MockRestart::default(),
    );
    dev.setup();
    dev
}

fn booted() -> Device {
    device(MockNvs::default(), Some(NOON))
}

/// Tick the device until `done` holds for the client.
fn run_until(dev: &mut Device, client: &mut TestClient, done: impl Fn(&TestClient) -> bool) {
    for _ in 0..100 {
        dev.tick();
        client.drain();
        if done(client) {
            return;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    panic!("device did not answer");
}

/// A client subscribed to both outbound topics.
fn attach(dev: &mut Device) -> TestClient {
    let port = dev.protocol().bus().local_addr().unwrap().port();
    let mut client = TestClient::connect(port, "phone");
    client.subscribe(1, "response");
    client.subscribe(2, "doorRing");
    run_until(dev, &mut client, |c| c.acks.len() == 3);
    client
}

fn command(dev: &mut Device, client: &mut TestClient, cmd: &str, replies: usize) -> Vec<String> {
    let before = client.payloads("response").len();
    client.publish("cmd", cmd);
    run_until(dev, client, |c| c.payloads("response").len() >= before + replies);
    client.payloads("response")[before..]
        .iter()
        .map(|s| (*s).to_owned())
        .collect()
}

#[test]
fn boot_associates_and_connects_to_own_broker() {
    let mut dev = booted();
    assert!(dev.network().is_associated());
    assert!(dev.network().time_valid());
    assert_eq!(dev.protocol().start_time(), NOON_LOCAL);
    assert_eq!(dev.controller().bell_state(), RelayState::Idle);

    assert_eq!(dev.tick(), ControllerStatus::Running);
    assert!(dev.protocol().is_connected());
    let log: Vec<&String> = dev.protocol().action_log().iter().collect();
    assert_eq!(log, vec![&format!("{NOON_LOCAL} Device started")]);
}

#[test]
fn ping_is_answered_with_pong() {
    let mut dev = booted();
    let mut client = attach(&mut dev);
    assert_eq!(command(&mut dev, &mut client, "ping", 1), vec!["pong"]);
}

#[test]
fn unknown_command_gets_no_reply() {
    let mut dev = booted();
    let mut client = attach(&mut dev);
    client.publish("cmd", "openSesame");
    for _ in 0..10 {
        dev.tick();
        client.drain();
    }
    assert!(client.received.is_empty());
    assert!(!dev.controller().reboot_pending());
}

#[test]
fn ring_runs_bell_and_notifies_subscribers() {
    let mut dev = booted();
    let mut client = attach(&mut dev);

    dev.board_mut().set_input(Input::Ring, true);
    for _ in 0..4 {
        dev.tick();
    }
    assert_eq!(dev.controller().bell_state(), RelayState::Idle);

    dev.tick();
    assert_eq!(dev.controller().bell_state(), RelayState::Running);
    assert_eq!(dev.controller().buzzer_state(), RelayState::Idle);
    assert!(dev.board().relay(Relay::ExtBell));

    run_until(&mut dev, &mut client, |c| !c.payloads("doorRing").is_empty());
    assert_eq!(client.payloads("doorRing"), vec![format!("ring {NOON_LOCAL}")]);
    let last = dev.protocol().action_log().iter().last().unwrap();
    assert_eq!(last, &format!("{NOON_LOCAL} ring"));
}

#[test]
fn test_ring_command_rings_remotely() {
    let mut dev = booted();
    let mut client = attach(&mut dev);
    client.publish("cmd", "testRing");
    run_until(&mut dev, &mut client, |c| !c.payloads("doorRing").is_empty());

    assert_eq!(
        client.payloads("doorRing"),
        vec![format!("testRing {NOON_LOCAL}")]
    );
    assert!(dev.controller().ring_active());
    assert!(dev.controller().bell_blink_active());
    assert_ne!(dev.controller().bell_state(), RelayState::Idle);
}

#[test]
fn raw_data_can_be_read_mid_capture() {
    let mut dev = booted();
    let mut client = attach(&mut dev);

    for level in [true, true, true, false] {
        dev.board_mut().set_input(Input::Ring, level);
        dev.tick();
    }
    assert!(!dev.controller().ring_active());

    let replies = command(&mut dev, &mut client, "getRawData", 2);
    assert_eq!(replies.len(), 2);
    assert_eq!(replies[1], "endMultiResponse");
    let samples = replies[0]
        .strip_prefix(&format!("{NOON_LOCAL} 1110"))
        .unwrap();
    assert!(samples.chars().all(|c| c == '0'));
}

#[test]
fn auto_buzz_command_persists_and_is_announced() {
    let mut dev = booted();
    let mut client = attach(&mut dev);

    client.publish("cmd", "autoBuzzOn");
    run_until(&mut dev, &mut client, |c| !c.payloads("doorRing").is_empty());
    assert_eq!(client.payloads("doorRing"), vec!["autoBuzzOn"]);
    assert_eq!(dev.storage().stored, Some(ControllerConfig { auto_buzz: true }));

    client.publish("cmd", "autoBuzzOn");
    run_until(&mut dev, &mut client, |c| c.payloads("doorRing").len() == 2);
    assert_eq!(dev.storage().writes, 1);

    assert_eq!(
        command(&mut dev, &mut client, "getAutoBuzz", 1),
        vec!["autoBuzzOn"]
    );
}

#[test]
fn buzz_is_acknowledged_and_logged() {
    let mut dev = booted();
    let mut client = attach(&mut dev);

    assert_eq!(command(&mut dev, &mut client, "buzz", 1), vec!["buzzAck"]);
    assert_eq!(dev.controller().buzzer_state(), RelayState::Running);

    let log = command(&mut dev, &mut client, "getActionLog", 3);
    assert_eq!(
        log,
        vec![
            format!("{NOON_LOCAL} Device started"),
            format!("{NOON_LOCAL} buzz (manual)"),
            "endMultiResponse".to_owned(),
        ]
    );
}

#[test]
fn ack_ring_command_is_announced() {
    let mut dev = booted();
    let mut client = attach(&mut dev);
    client.publish("cmd", "testRing");
    client.publish("cmd", "ackRing");
    run_until(&mut dev, &mut client, |c| c.payloads("doorRing").len() == 2);

    assert_eq!(client.payloads("doorRing")[1], "ackRing");
    assert!(!dev.controller().ring_active());
    assert!(dev.controller().ack_led_active());
}

#[test]
fn broker_loss_reboots_exactly_once() {
    let mut dev = booted();
    dev.tick();
    assert!(dev.protocol().is_connected());

    dev.protocol_mut().bus_mut().stop();

    let mut due_at = None;
    for i in 1..=25 {
        if dev.tick() == ControllerStatus::RestartDue {
            due_at = Some(i);
            break;
        }
        assert_eq!(dev.restart_port().count, 0);
        assert!(dev.controller().reboot_pending());
    }
    assert!(due_at.is_some(), "restart never became due");
    assert_eq!(dev.restart_port().count, 1);
}

#[test]
fn wifi_loss_requests_reboot() {
    let mut dev = booted();
    dev.tick();
    dev.network_mut().wifi_mut().drop_sim_link();

    dev.tick();
    assert!(dev.controller().reboot_pending());
    assert!(!dev.network().is_associated());
}

#[test]
fn unreachable_wifi_times_out_after_sweep() {
    let mut network = NetworkConfig {
        broker_port: 0,
        ..NetworkConfig::default()
    };
    network.add_credential("Elsewhere", "password1");
    let mut dev: Device = Scheduler::new(
        network,
        &Timing::default(),
        WifiAdapter::new(),
        SntpTime::new(),
        LocalBroker::new(0, 4),
        MockBoard::new(),
        MockNvs::default(),
        CountingDelay::default(),
        MockRestart::default(),
    );
    dev.setup();

    assert!(!dev.network().is_associated());
    dev.tick();
    assert!(dev.controller().reboot_pending());
}

#[test]
fn first_time_sync_is_logged() {
    let mut dev = device(MockNvs::default(), None);
    assert!(!dev.network().time_valid());
    assert!(
        dev.protocol()
            .start_time()
            .starts_with("(No NTP time, seconds since device start:")
    );

    dev.tick();
    dev.network_mut().time_source_mut().set_sim_time(Some(NOON));
    dev.tick();

    assert!(dev.network().time_valid());
    let last = dev.protocol().action_log().iter().last().unwrap();
    assert_eq!(last, &format!("{NOON_LOCAL} Received first NTP time"));
}
