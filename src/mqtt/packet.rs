//! MQTT 3.1.1 framing for the broker, on top of `rumqttc`'s packet codec.
//!
//! The decoder accumulates incoming bytes and yields complete packets, so a
//! single socket read may carry part of a packet or several packets back to
//! back. The encoders produce the packets a broker sends back to clients.

use core::fmt;

use bytes::BytesMut;
use rumqttc::mqttbytes::v4::{ConnAck, PingResp, PubAck, Publish, SubAck, UnsubAck};
use rumqttc::mqttbytes::{self, QoS};

pub use rumqttc::mqttbytes::v4::{ConnectReturnCode, Packet, SubscribeReasonCode};

/// Largest accepted packet body. Matches the 1 KiB client buffer of the
/// deployed device.
pub const MAX_PACKET_SIZE: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PacketError {
    /// Packet exceeds [`MAX_PACKET_SIZE`].
    TooLarge,
    /// CONNECT carrying a protocol level other than 3.1.1.
    UnsupportedProtocolLevel(u8),
    /// Anything else the codec refused.
    Malformed(String),
}

impl fmt::Display for PacketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooLarge => write!(f, "packet exceeds {} bytes", MAX_PACKET_SIZE),
            Self::UnsupportedProtocolLevel(level) => {
                write!(f, "unsupported protocol level {}", level)
            }
            Self::Malformed(reason) => write!(f, "malformed packet: {}", reason),
        }
    }
}

impl From<mqttbytes::Error> for PacketError {
    fn from(e: mqttbytes::Error) -> Self {
        match e {
            mqttbytes::Error::PayloadSizeLimitExceeded(_) => Self::TooLarge,
            mqttbytes::Error::InvalidProtocolLevel(level) => Self::UnsupportedProtocolLevel(level),
            other => Self::Malformed(other.to_string()),
        }
    }
}

// ── Decoding ──────────────────────────────────────────────────

/// Streaming packet decoder.
#[derive(Debug, Default)]
pub struct PacketDecoder {
    buf: BytesMut,
}

impl PacketDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append received bytes.
    pub fn feed(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Take the next complete packet, if the buffer holds one.
    ///
    /// Any error leaves the stream unrecoverable; the buffer is cleared and
    /// the caller is expected to drop the connection.
    pub fn next_packet(&mut self) -> Result<Option<Packet>, PacketError> {
        if self.buf.is_empty() {
            return Ok(None);
        }
        match rumqttc::mqttbytes::v4::read(&mut self.buf, MAX_PACKET_SIZE) {
            Ok(packet) => Ok(Some(packet)),
            Err(mqttbytes::Error::InsufficientBytes(_)) => Ok(None),
            Err(e) => {
                self.buf.clear();
                Err(e.into())
            }
        }
    }

    /// Bytes held but not yet decoded.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    pub fn reset(&mut self) {
        self.buf.clear();
    }
}

// ── Encoding ──────────────────────────────────────────────────

fn frame(
    write: impl FnOnce(&mut BytesMut) -> Result<usize, mqttbytes::Error>,
) -> Result<Vec<u8>, PacketError> {
    let mut buf = BytesMut::new();
    write(&mut buf)?;
    if buf.len() > MAX_PACKET_SIZE {
        return Err(PacketError::TooLarge);
    }
    Ok(buf.to_vec())
}

pub fn encode_connack(code: ConnectReturnCode) -> Result<Vec<u8>, PacketError> {
    frame(|buf| ConnAck::new(code, false).write(buf))
}

/// QoS 0 PUBLISH.
pub fn encode_publish(topic: &str, payload: &[u8]) -> Result<Vec<u8>, PacketError> {
    frame(|buf| Publish::new(topic, QoS::AtMostOnce, payload).write(buf))
}

pub fn encode_puback(packet_id: u16) -> Result<Vec<u8>, PacketError> {
    frame(|buf| PubAck::new(packet_id).write(buf))
}

/// SUBACK carrying `codes[i]` for the i-th filter.
pub fn encode_suback(
    packet_id: u16,
    codes: Vec<SubscribeReasonCode>,
) -> Result<Vec<u8>, PacketError> {
    frame(|buf| SubAck::new(packet_id, codes).write(buf))
}

pub fn encode_unsuback(packet_id: u16) -> Result<Vec<u8>, PacketError> {
    frame(|buf| UnsubAck::new(packet_id).write(buf))
}

pub fn encode_pingresp() -> Result<Vec<u8>, PacketError> {
    frame(|buf| PingResp.write(buf))
}
