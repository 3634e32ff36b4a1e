//! Mock adapters for integration tests.
//!
//! Every port is backed by plain data so tests can set inputs and assert on
//! outputs, storage writes and restarts without real peripherals. The
//! [`TestClient`] speaks just enough MQTT 3.1.1 to drive the local broker
//! over a real socket.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

use doorbell::app::ports::{
    ConfigError, ConfigPort, EventSink, Input, InputPort, Led, OutputPort, Relay, RestartPort,
    WallClock,
};
use doorbell::config::ControllerConfig;
use embedded_hal::delay::DelayNs;

// ── MockBoard ─────────────────────────────────────────────────

#[derive(Default)]
pub struct MockBoard {
    pub inputs: HashMap<Input, bool>,
    pub leds: HashMap<Led, bool>,
    pub relays: HashMap<Relay, bool>,
    pub heartbeat: bool,
    /// Set if both relays were ever energized at once.
    pub relays_overlapped: bool,
}

impl MockBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_input(&mut self, input: Input, active: bool) {
        self.inputs.insert(input, active);
    }

    pub fn led(&self, led: Led) -> bool {
        self.leds.get(&led).copied().unwrap_or(false)
    }

    pub fn relay(&self, relay: Relay) -> bool {
        self.relays.get(&relay).copied().unwrap_or(false)
    }
}

impl InputPort for MockBoard {
    fn is_active(&mut self, input: Input) -> bool {
        self.inputs.get(&input).copied().unwrap_or(false)
    }
}

impl OutputPort for MockBoard {
    fn set_led(&mut self, led: Led, on: bool) {
        self.leds.insert(led, on);
    }

    fn set_relay(&mut self, relay: Relay, energized: bool) {
        self.relays.insert(relay, energized);
        if self.relay(Relay::Buzzer) && self.relay(Relay::ExtBell) {
            self.relays_overlapped = true;
        }
    }

    fn set_heartbeat(&mut self, on: bool) {
        self.heartbeat = on;
    }
}

// ── MockNvs ───────────────────────────────────────────────────

#[derive(Default)]
pub struct MockNvs {
    pub stored: Option<ControllerConfig>,
    pub writes: usize,
}

impl MockNvs {
    pub fn with(config: ControllerConfig) -> Self {
        Self {
            stored: Some(config),
            writes: 0,
        }
    }
}

impl ConfigPort for MockNvs {
    fn load(&self) -> Result<ControllerConfig, ConfigError> {
        Ok(self.stored.unwrap_or_default())
    }

    fn save(&mut self, config: &ControllerConfig) -> Result<(), ConfigError> {
        self.stored = Some(*config);
        self.writes += 1;
        Ok(())
    }
}

// ── Delay / restart / clock ───────────────────────────────────

/// Records requested delay instead of sleeping.
#[derive(Default)]
pub struct CountingDelay {
    pub total_ns: u64,
}

impl CountingDelay {
    pub fn total_ms(&self) -> u64 {
        self.total_ns / 1_000_000
    }
}

impl DelayNs for CountingDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += u64::from(ns);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.total_ns += u64::from(ms) * 1_000_000;
    }
}

#[derive(Default)]
pub struct MockRestart {
    pub count: usize,
}

impl RestartPort for MockRestart {
    fn restart(&mut self) {
        self.count += 1;
    }
}

pub struct FixedClock(pub &'static str);

impl WallClock for FixedClock {
    fn date_time(&self) -> String {
        self.0.to_owned()
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
    Ring { test: bool, auto_buzz: bool },
    Buzz { auto: bool },
    AutoBuzz(bool),
    Ack,
}

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<Recorded>,
}

impl EventSink for RecordingSink {
    fn on_ring(&mut self, test: bool, auto_buzz: bool) {
        self.events.push(Recorded::Ring { test, auto_buzz });
    }

    fn on_buzz(&mut self, auto: bool) {
        self.events.push(Recorded::Buzz { auto });
    }

    fn on_auto_buzz_changed(&mut self, enabled: bool) {
        self.events.push(Recorded::AutoBuzz(enabled));
    }

    fn on_ring_acknowledged(&mut self) {
        self.events.push(Recorded::Ack);
    }
}

// ── TestClient ────────────────────────────────────────────────

const CONNECT: u8 = 0x10;
const PUBLISH: u8 = 0x30;
const SUBSCRIBE: u8 = 0x82;

fn frame(first: u8, body: &[u8]) -> Vec<u8> {
    let mut out = vec![first];
    let mut len = body.len();
    loop {
        let mut byte = (len % 128) as u8;
        len /= 128;
        if len > 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if len == 0 {
            break;
        }
    }
    out.extend_from_slice(body);
    out
}

fn put_str(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(&(s.len() as u16).to_be_bytes());
    out.extend_from_slice(s.as_bytes());
}

/// Minimal MQTT client for driving the broker from tests.
pub struct TestClient {
    stream: TcpStream,
    rx: Vec<u8>,
    /// Publications received so far, as (topic, payload).
    pub received: Vec<(String, String)>,
    /// Every non-PUBLISH packet received, as (fixed-header byte, body).
    pub acks: Vec<(u8, Vec<u8>)>,
}

impl TestClient {
    pub fn connect(port: u16, client_id: &str) -> Self {
        Self::connect_with_keep_alive(port, client_id, 60)
    }

    pub fn connect_with_keep_alive(port: u16, client_id: &str, keep_alive_secs: u16) -> Self {
        let stream = TcpStream::connect(SocketAddr::from(([127, 0, 0, 1], port))).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_millis(10)))
            .unwrap();
        let mut client = Self {
            stream,
            rx: Vec::new(),
            received: Vec::new(),
            acks: Vec::new(),
        };

        let mut body = Vec::new();
        put_str(&mut body, "MQTT");
        body.extend_from_slice(&[4, 0x02]);
        body.extend_from_slice(&keep_alive_secs.to_be_bytes());
        put_str(&mut body, client_id);
        client.send(&frame(CONNECT, &body));
        client
    }

    pub fn send(&mut self, bytes: &[u8]) {
        self.stream.write_all(bytes).unwrap();
    }

    pub fn subscribe(&mut self, packet_id: u16, topic: &str) {
        let mut body = packet_id.to_be_bytes().to_vec();
        put_str(&mut body, topic);
        body.push(0);
        self.send(&frame(SUBSCRIBE, &body));
    }

    pub fn publish(&mut self, topic: &str, payload: &str) {
        let mut body = Vec::new();
        put_str(&mut body, topic);
        body.extend_from_slice(payload.as_bytes());
        self.send(&frame(PUBLISH, &body));
    }

    /// Read whatever the socket holds and split it into packets.
    pub fn drain(&mut self) {
        let mut buf = [0u8; 512];
        while let Ok(n) = self.stream.read(&mut buf) {
            if n == 0 {
                break;
            }
            self.rx.extend_from_slice(&buf[..n]);
        }
        while let Some((first, body)) = self.split_frame() {
            if first & 0xF0 == PUBLISH {
                let topic_len = usize::from(u16::from_be_bytes([body[0], body[1]]));
                let topic = String::from_utf8_lossy(&body[2..2 + topic_len]).into_owned();
                let payload = String::from_utf8_lossy(&body[2 + topic_len..]).into_owned();
                self.received.push((topic, payload));
            } else {
                self.acks.push((first, body));
            }
        }
    }

    fn split_frame(&mut self) -> Option<(u8, Vec<u8>)> {
        let first = *self.rx.first()?;
        let mut len = 0usize;
        let mut shift = 0;
        let mut idx = 1;
        loop {
            let byte = *self.rx.get(idx)?;
            len |= usize::from(byte & 0x7F) << shift;
            idx += 1;
            if byte & 0x80 == 0 {
                break;
            }
            shift += 7;
        }
        if self.rx.len() < idx + len {
            return None;
        }
        let body = self.rx[idx..idx + len].to_vec();
        self.rx.drain(..idx + len);
        Some((first, body))
    }

    /// Payloads received on `topic`, in order.
    pub fn payloads(&self, topic: &str) -> Vec<&str> {
        self.received
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, p)| p.as_str())
            .collect()
    }
}
