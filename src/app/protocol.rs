//! Message protocol handler.
//!
//! Bridges the controller and the device's own broker session: decodes
//! commands arriving on `cmd`, turns them into controller calls, and
//! publishes controller events and replies. It also keeps the action log,
//! the last [`ACTION_LOG_LEN`] timestamped events, for `getActionLog`.
//!
//! ## Connection policy
//!
//! Before the first successful connect, each tick makes one connect
//! attempt and, on failure, blocks for `broker_retry_secs` of startup
//! cycles. Once a connection has existed, losing it requests a controller
//! reboot instead of reconnecting: the broker runs on this device, so a
//! dropped session means the broker itself is gone.

use log::{debug, info, warn};

use crate::config::{ACTION_LOG_LEN, NetworkConfig, Timing};
use crate::ring_buffer::RingBuffer;

use super::commands::{
    self, Command, MSG_ACK_RING, MSG_BUZZ_ACK, MSG_END_MULTI_RESPONSE, MSG_PONG, TOPIC_CMD,
    TOPIC_DOOR_RING, TOPIC_RESPONSE,
};
use super::controller::Controller;
use super::events;
use super::ports::{DeviceIo, EventSink, InboundMessage, MessageBus, WallClock};

pub type ActionLog = RingBuffer<String, ACTION_LOG_LEN>;

pub struct ProtocolHandler<B: MessageBus> {
    bus: B,
    action_log: ActionLog,
    start_time: String,
    /// Latched once the session has been up; cleared on loss.
    connected: bool,
    client_id: &'static str,
    retry_secs: u32,
}

impl<B: MessageBus> ProtocolHandler<B> {
    pub fn new(bus: B, network: &NetworkConfig, timing: &Timing) -> Self {
        Self {
            bus,
            action_log: RingBuffer::new(),
            start_time: String::new(),
            connected: false,
            client_id: network.client_id,
            retry_secs: timing.broker_retry_secs,
        }
    }

    /// Record the start time and bring the broker up.
    pub fn setup(&mut self, clock: &dyn WallClock) {
        self.start_time = clock.date_time();
        self.log_action(clock, "Device started");

        match self.bus.start() {
            Ok(()) => info!("MQTT: broker started"),
            Err(e) => warn!("MQTT: broker failed to start: {}", e),
        }
    }

    /// One protocol cycle: keep the session up, then serve queued commands.
    pub fn tick(
        &mut self,
        controller: &mut Controller,
        io: &mut DeviceIo<'_>,
        clock: &dyn WallClock,
    ) {
        if !self.bus.is_connected() {
            if self.connected {
                self.connected = false;
                warn!("MQTT: connection lost, reboot");
                controller.reboot();
                return;
            }
            if !self.try_connect(controller, io) {
                return;
            }
        }

        self.connected = true;
        self.bus.poll();
        while let Some(message) = self.bus.take_message() {
            self.dispatch(message, controller, io, clock);
        }
    }

    fn try_connect(&mut self, controller: &mut Controller, io: &mut DeviceIo<'_>) -> bool {
        info!("MQTT: connect...");
        let result = self
            .bus
            .connect(self.client_id)
            .and_then(|()| self.bus.subscribe(TOPIC_CMD));

        match result {
            Ok(()) => {
                info!("MQTT: connected, subscribed to topic '{}'", TOPIC_CMD);
                true
            }
            Err(e) => {
                warn!("MQTT: connect failed: {}", e);
                controller.wait_seconds(self.retry_secs, io);
                false
            }
        }
    }

    fn dispatch(
        &mut self,
        message: InboundMessage,
        controller: &mut Controller,
        io: &mut DeviceIo<'_>,
        clock: &dyn WallClock,
    ) {
        if message.topic != TOPIC_CMD {
            warn!("MQTT: received data on unexpected topic: {}", message.topic);
            return;
        }
        let Some(command) = Command::parse(&message.payload) else {
            warn!("MQTT: received unknown command: {}", message.payload);
            return;
        };
        debug!("MQTT: command {}", command);

        match command {
            Command::Buzz => {
                controller.buzz(&mut self.sink(clock));
                self.respond(MSG_BUZZ_ACK);
            }
            Command::AutoBuzzOn => {
                controller.set_auto_buzz(true, &mut *io.storage, &mut self.sink(clock));
            }
            Command::AutoBuzzOff => {
                controller.set_auto_buzz(false, &mut *io.storage, &mut self.sink(clock));
            }
            Command::TestRing => controller.ring(true, &mut self.sink(clock)),
            Command::GetActionLog => {
                for entry in &self.action_log {
                    publish(&mut self.bus, TOPIC_RESPONSE, entry);
                }
                self.respond(MSG_END_MULTI_RESPONSE);
            }
            Command::Ping => self.respond(MSG_PONG),
            Command::GetAutoBuzz => {
                self.respond(commands::auto_buzz_message(controller.auto_buzz()));
            }
            Command::AckRing => controller.ack_ring(&mut self.sink(clock)),
            Command::GetRawData => {
                for line in controller.raw_data_lines(clock) {
                    self.respond(&line);
                }
                self.respond(MSG_END_MULTI_RESPONSE);
            }
            Command::GetStartTime => {
                publish(&mut self.bus, TOPIC_RESPONSE, &self.start_time);
            }
        }
    }

    fn respond(&mut self, payload: &str) {
        publish(&mut self.bus, TOPIC_RESPONSE, payload);
    }

    /// Append `"<time> <text>"` to the action log.
    pub fn log_action(&mut self, clock: &dyn WallClock, text: &str) {
        push_entry(&mut self.action_log, clock, text);
    }

    /// Event sink for one controller call, bound to `clock`.
    pub fn sink<'a>(&'a mut self, clock: &'a dyn WallClock) -> ProtocolSink<'a, B> {
        ProtocolSink {
            bus: &mut self.bus,
            action_log: &mut self.action_log,
            clock,
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn action_log(&self) -> &ActionLog {
        &self.action_log
    }

    pub fn start_time(&self) -> &str {
        &self.start_time
    }

    /// Whether the broker session is established.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }
}

fn push_entry(log: &mut ActionLog, clock: &dyn WallClock, text: &str) {
    log.push(format!("{} {}", clock.date_time(), text));
}

fn publish<B: MessageBus>(bus: &mut B, topic: &str, payload: &str) {
    if let Err(e) = bus.publish(topic, payload) {
        warn!("MQTT: publish to '{}' failed: {}", topic, e);
    }
}

/// [`EventSink`] that publishes controller events and records them in the
/// action log.
pub struct ProtocolSink<'a, B: MessageBus> {
    bus: &'a mut B,
    action_log: &'a mut ActionLog,
    clock: &'a dyn WallClock,
}

impl<B: MessageBus> EventSink for ProtocolSink<'_, B> {
    fn on_ring(&mut self, test: bool, auto_buzz: bool) {
        let word = events::ring_word(test);
        info!("MQTT: {} detected", word);
        let date_time = self.clock.date_time();
        self.action_log.push(format!("{} {}", date_time, word));

        if self.bus.is_connected() {
            let notice = events::ring_notice(test, auto_buzz, &date_time);
            publish(&mut *self.bus, TOPIC_DOOR_RING, &notice);
        } else {
            warn!("MQTT: not connected, cannot publish ring event");
        }
    }

    fn on_buzz(&mut self, auto: bool) {
        push_entry(self.action_log, self.clock, events::buzz_entry(auto));
    }

    fn on_auto_buzz_changed(&mut self, enabled: bool) {
        publish(&mut *self.bus, TOPIC_DOOR_RING, commands::auto_buzz_message(enabled));
    }

    fn on_ring_acknowledged(&mut self) {
        if self.bus.is_connected() {
            publish(&mut *self.bus, TOPIC_DOOR_RING, MSG_ACK_RING);
        }
    }
}
