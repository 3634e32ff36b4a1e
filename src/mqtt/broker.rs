//! Local MQTT broker.
//!
//! A small MQTT 3.1.1 broker that runs inside the firmware's main loop:
//!
//! - non-blocking `TcpListener`, serviced once per [`poll`](MessageBus::poll)
//! - at most `max_clients` network sessions
//! - exact-match topic routing, QoS 0 delivery (QoS 1 publishes are
//!   acknowledged with PUBACK), no retained messages, no wildcards, no auth
//! - sessions silent for 1.5x their keep-alive are closed; a socket that
//!   has not sent CONNECT within [`CONNECT_TIMEOUT`] is closed too
//! - replies a slow socket cannot take yet wait in a bounded per-session
//!   queue that is flushed on every poll
//!
//! The device itself is a client of this broker through an in-process
//! session, exposed as the [`MessageBus`] implementation. A fatal listener
//! error stops the broker and drops that session, which the protocol
//! handler sees as a lost connection.

use core::fmt;
use std::collections::VecDeque;
use std::io::{self, ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};
use rumqttc::mqttbytes::QoS;

use crate::app::ports::{BusError, InboundMessage, MessageBus};

use super::packet::{
    self, ConnectReturnCode, Packet, PacketDecoder, PacketError, SubscribeReasonCode,
};

/// Socket reads per session per poll.
const MAX_READS_PER_POLL: usize = 4;
const READ_CHUNK: usize = 512;

/// Bytes a session may have queued for its socket before it is dropped.
pub const MAX_PENDING_OUT: usize = 16 * 1024;
/// Time a fresh socket gets to send CONNECT.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokerError {
    /// The listening socket could not be bound.
    Bind(ErrorKind),
    /// The listening socket could not be configured.
    Listener(ErrorKind),
}

impl fmt::Display for BrokerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bind(kind) => write!(f, "bind failed: {}", kind),
            Self::Listener(kind) => write!(f, "listener setup failed: {}", kind),
        }
    }
}

/// Bytes waiting for the socket to accept them.
#[derive(Debug, Default)]
struct Outbox {
    pending: Vec<u8>,
}

impl Outbox {
    /// Queue `bytes`. Returns `false` when the queue would exceed
    /// [`MAX_PENDING_OUT`]; nothing is queued in that case.
    fn push(&mut self, bytes: &[u8]) -> bool {
        if self.pending.len() + bytes.len() > MAX_PENDING_OUT {
            return false;
        }
        self.pending.extend_from_slice(bytes);
        true
    }

    fn len(&self) -> usize {
        self.pending.len()
    }

    /// Write as much as `out` accepts. `WouldBlock` leaves the rest queued.
    fn flush(&mut self, out: &mut impl Write) -> io::Result<()> {
        while !self.pending.is_empty() {
            match out.write(&self.pending) {
                Ok(0) => return Err(ErrorKind::WriteZero.into()),
                Ok(n) => {
                    self.pending.drain(..n);
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

/// One network client.
struct Session {
    stream: TcpStream,
    addr: SocketAddr,
    decoder: PacketDecoder,
    /// Set by CONNECT; `None` until then.
    client_id: Option<String>,
    subscriptions: Vec<String>,
    /// Keep-alive from CONNECT; `None` when the client disabled it.
    keep_alive: Option<Duration>,
    last_seen: Instant,
    outbox: Outbox,
    alive: bool,
}

impl Session {
    fn new(stream: TcpStream, addr: SocketAddr, now: Instant) -> Self {
        Self {
            stream,
            addr,
            decoder: PacketDecoder::new(),
            client_id: None,
            subscriptions: Vec::new(),
            keep_alive: None,
            last_seen: now,
            outbox: Outbox::default(),
            alive: true,
        }
    }

    fn name(&self) -> &str {
        self.client_id.as_deref().unwrap_or("<unnamed>")
    }

    fn is_subscribed(&self, topic: &str) -> bool {
        self.client_id.is_some() && self.subscriptions.iter().any(|s| s == topic)
    }

    /// Queue `bytes` and push out what the socket takes right now.
    fn send(&mut self, bytes: &[u8]) {
        if !self.alive {
            return;
        }
        if !self.outbox.push(bytes) {
            self.drop_session("send queue full");
            return;
        }
        self.flush();
    }

    fn send_encoded(&mut self, encoded: Result<Vec<u8>, PacketError>) {
        match encoded {
            Ok(bytes) => self.send(&bytes),
            Err(e) => warn!("Broker: cannot encode reply to {}: {}", self.name(), e),
        }
    }

    fn flush(&mut self) {
        if let Err(e) = self.outbox.flush(&mut self.stream) {
            warn!("Broker: write to {} failed: {}", self.addr, e);
            self.alive = false;
        }
    }

    fn drop_session(&mut self, reason: &str) {
        warn!("Broker: dropping {} ({}): {}", self.name(), self.addr, reason);
        self.alive = false;
    }

    /// Silence allowed before the session is closed.
    fn idle_limit(&self) -> Option<Duration> {
        match self.client_id {
            None => Some(CONNECT_TIMEOUT),
            Some(_) => self.keep_alive.map(|keep_alive| keep_alive * 3 / 2),
        }
    }

    fn expire_if_idle(&mut self, now: Instant) {
        let Some(limit) = self.idle_limit() else {
            return;
        };
        if now.saturating_duration_since(self.last_seen) > limit {
            self.drop_session("keep-alive expired");
        }
    }

    /// Read what the socket holds and act on every complete packet.
    /// Publications to route are appended to `outbound`.
    fn service(&mut self, now: Instant, outbound: &mut Vec<(String, Vec<u8>)>) {
        let mut buf = [0u8; READ_CHUNK];
        for _ in 0..MAX_READS_PER_POLL {
            match self.stream.read(&mut buf) {
                Ok(0) => {
                    info!("Broker: {} ({}) closed the connection", self.name(), self.addr);
                    self.alive = false;
                    return;
                }
                Ok(n) => self.decoder.feed(&buf[..n]),
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => {
                    warn!("Broker: read from {} failed: {}", self.addr, e);
                    self.alive = false;
                    return;
                }
            }
        }

        while self.alive {
            match self.decoder.next_packet() {
                Ok(Some(packet)) => {
                    self.last_seen = now;
                    self.handle(packet, outbound);
                }
                Ok(None) => break,
                Err(PacketError::UnsupportedProtocolLevel(level)) if self.client_id.is_none() => {
                    self.send_encoded(packet::encode_connack(
                        ConnectReturnCode::RefusedProtocolVersion,
                    ));
                    self.drop_session(&format!("unsupported protocol level {}", level));
                }
                Err(e) => self.drop_session(&e.to_string()),
            }
        }
    }

    fn handle(&mut self, packet: Packet, outbound: &mut Vec<(String, Vec<u8>)>) {
        if self.client_id.is_none() && !matches!(packet, Packet::Connect(_)) {
            self.drop_session("packet before CONNECT");
            return;
        }

        match packet {
            Packet::Connect(connect) => {
                if self.client_id.is_some() {
                    self.drop_session("second CONNECT");
                    return;
                }
                if connect.client_id.is_empty() && !connect.clean_session {
                    self.send_encoded(packet::encode_connack(ConnectReturnCode::BadClientId));
                    self.drop_session("empty client id without clean session");
                    return;
                }
                info!(
                    "Broker: client '{}' connected from {} (keep-alive {} s)",
                    connect.client_id, self.addr, connect.keep_alive
                );
                self.keep_alive = (connect.keep_alive > 0)
                    .then(|| Duration::from_secs(u64::from(connect.keep_alive)));
                self.client_id = Some(connect.client_id);
                self.send_encoded(packet::encode_connack(ConnectReturnCode::Success));
            }
            Packet::Publish(publish) => {
                match publish.qos {
                    QoS::AtMostOnce => {}
                    QoS::AtLeastOnce => self.send_encoded(packet::encode_puback(publish.pkid)),
                    QoS::ExactlyOnce => {
                        self.drop_session("QoS 2 not supported");
                        return;
                    }
                }
                debug!("Broker: {} published on '{}'", self.name(), publish.topic);
                outbound.push((publish.topic, publish.payload.to_vec()));
            }
            Packet::Subscribe(subscribe) => {
                let codes = subscribe
                    .filters
                    .into_iter()
                    .map(|filter| self.add_subscription(filter.path))
                    .collect();
                self.send_encoded(packet::encode_suback(subscribe.pkid, codes));
            }
            Packet::Unsubscribe(unsubscribe) => {
                self.subscriptions
                    .retain(|s| !unsubscribe.topics.contains(s));
                self.send_encoded(packet::encode_unsuback(unsubscribe.pkid));
            }
            Packet::PingReq => self.send_encoded(packet::encode_pingresp()),
            Packet::Disconnect => {
                info!("Broker: client '{}' disconnected", self.name());
                self.alive = false;
            }
            other => self.drop_session(&format!("unexpected {:?}", other)),
        }
    }

    /// QoS 0 is granted for exact topics; filters the broker cannot serve
    /// are refused.
    fn add_subscription(&mut self, filter: String) -> SubscribeReasonCode {
        if filter.is_empty() || filter.contains(['#', '+']) {
            warn!("Broker: {} asked for unsupported filter '{}'", self.name(), filter);
            return SubscribeReasonCode::Failure;
        }
        if !self.subscriptions.contains(&filter) {
            self.subscriptions.push(filter);
        }
        SubscribeReasonCode::Success(QoS::AtMostOnce)
    }
}

/// The device's own in-process session.
#[derive(Debug, Default)]
struct LocalSession {
    connected: bool,
    subscriptions: Vec<String>,
    inbox: VecDeque<InboundMessage>,
}

pub struct LocalBroker {
    port: u16,
    max_clients: usize,
    listener: Option<TcpListener>,
    sessions: Vec<Session>,
    local: LocalSession,
}

impl LocalBroker {
    /// `port` 0 lets the OS choose (see [`local_addr`](Self::local_addr)).
    pub fn new(port: u16, max_clients: usize) -> Self {
        Self {
            port,
            max_clients,
            listener: None,
            sessions: Vec::new(),
            local: LocalSession::default(),
        }
    }

    /// Bind the listening socket. Idempotent.
    pub fn bind(&mut self) -> Result<(), BrokerError> {
        if self.listener.is_some() {
            return Ok(());
        }
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr).map_err(|e| BrokerError::Bind(e.kind()))?;
        listener
            .set_nonblocking(true)
            .map_err(|e| BrokerError::Listener(e.kind()))?;

        info!(
            "Broker: listening on port {} (max {} clients)",
            self.port, self.max_clients
        );
        self.listener = Some(listener);
        Ok(())
    }

    /// Close every session, the local one included, and the listener.
    pub fn stop(&mut self) {
        self.listener = None;
        self.sessions.clear();
        self.local.connected = false;
        self.local.subscriptions.clear();
    }

    pub fn is_running(&self) -> bool {
        self.listener.is_some()
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.as_ref().and_then(|l| l.local_addr().ok())
    }

    /// Network sessions currently open.
    pub fn client_count(&self) -> usize {
        self.sessions.len()
    }

    fn accept_clients(&mut self) {
        let Some(listener) = self.listener.as_ref() else {
            return;
        };
        let mut fatal = false;
        loop {
            match listener.accept() {
                Ok((stream, addr)) => {
                    if self.sessions.len() >= self.max_clients {
                        warn!("Broker: client limit reached, refusing {}", addr);
                        continue;
                    }
                    if let Err(e) = stream.set_nonblocking(true) {
                        warn!("Broker: cannot configure socket for {}: {}", addr, e);
                        continue;
                    }
                    debug!("Broker: accepted {}", addr);
                    self.sessions.push(Session::new(stream, addr, Instant::now()));
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e)
                    if matches!(
                        e.kind(),
                        ErrorKind::Interrupted
                            | ErrorKind::ConnectionAborted
                            | ErrorKind::ConnectionReset
                    ) => {}
                Err(e) => {
                    error!("Broker: listener failed: {}", e);
                    fatal = true;
                    break;
                }
            }
        }
        if fatal {
            self.stop();
        }
    }

    /// Close every session that has been silent past its limit at `now`.
    pub fn expire_idle_sessions(&mut self, now: Instant) {
        for session in &mut self.sessions {
            session.expire_if_idle(now);
        }
        self.sessions.retain(|s| s.alive);
    }

    /// Bytes queued for network clients and not yet written.
    pub fn pending_out(&self) -> usize {
        self.sessions.iter().map(|s| s.outbox.len()).sum()
    }

    /// Deliver one publication to every exact-match subscriber.
    fn route(&mut self, topic: &str, payload: &[u8]) {
        if self.local.connected && self.local.subscriptions.iter().any(|s| s == topic) {
            self.local.inbox.push_back(InboundMessage {
                topic: topic.to_owned(),
                payload: String::from_utf8_lossy(payload).into_owned(),
            });
        }

        let subscribers = self.sessions.iter().filter(|s| s.is_subscribed(topic)).count();
        if subscribers == 0 {
            return;
        }
        let bytes = match packet::encode_publish(topic, payload) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Broker: cannot forward on '{}': {}", topic, e);
                return;
            }
        };
        for session in self.sessions.iter_mut().filter(|s| s.is_subscribed(topic)) {
            session.send(&bytes);
        }
    }
}

impl MessageBus for LocalBroker {
    fn start(&mut self) -> Result<(), BusError> {
        self.bind().map_err(|e| {
            error!("Broker: {}", e);
            BusError::BrokerDown
        })
    }

    fn connect(&mut self, client_id: &str) -> Result<(), BusError> {
        if !self.is_running() {
            return Err(BusError::BrokerDown);
        }
        self.local.connected = true;
        info!("Broker: local client '{}' connected", client_id);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.local.connected && self.is_running()
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), BusError> {
        if !self.is_connected() {
            return Err(BusError::NotConnected);
        }
        if !self.local.subscriptions.iter().any(|s| s == topic) {
            self.local.subscriptions.push(topic.to_owned());
        }
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: &str) -> Result<(), BusError> {
        if !self.is_connected() {
            return Err(BusError::NotConnected);
        }
        if packet::encode_publish(topic, payload.as_bytes()).is_err() {
            return Err(BusError::PayloadTooLarge);
        }
        self.route(topic, payload.as_bytes());
        self.sessions.retain(|s| s.alive);
        Ok(())
    }

    fn poll(&mut self) {
        if !self.is_running() {
            return;
        }
        self.accept_clients();

        let now = Instant::now();
        let mut outbound = Vec::new();
        for session in &mut self.sessions {
            session.flush();
            if session.alive {
                session.service(now, &mut outbound);
            }
        }
        self.sessions.retain(|s| s.alive);

        for (topic, payload) in outbound {
            self.route(&topic, &payload);
        }
        self.expire_idle_sessions(now);
    }

    fn take_message(&mut self) -> Option<InboundMessage> {
        self.local.inbox.pop_front()
    }
}
