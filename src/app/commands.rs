//! Inbound commands and the topic vocabulary.
//!
//! Remote clients publish a [`Command`] as the bare payload on
//! [`TOPIC_CMD`]. Replies go to [`TOPIC_RESPONSE`]; spontaneous device
//! notices (rings, acks, auto-buzz changes) go to [`TOPIC_DOOR_RING`].

/// Client → device commands.
pub const TOPIC_CMD: &str = "cmd";
/// Device → client notices.
pub const TOPIC_DOOR_RING: &str = "doorRing";
/// Device → client replies to commands.
pub const TOPIC_RESPONSE: &str = "response";

// ── Message payloads ──────────────────────────────────────────

pub const MSG_RING: &str = "ring";
pub const MSG_TEST_RING: &str = "testRing";
pub const MSG_ACK_RING: &str = "ackRing";
pub const MSG_AUTO_BUZZ_ON: &str = "autoBuzzOn";
pub const MSG_AUTO_BUZZ_OFF: &str = "autoBuzzOff";
pub const MSG_PONG: &str = "pong";
pub const MSG_BUZZ_ACK: &str = "buzzAck";
/// Terminates a multi-line reply.
pub const MSG_END_MULTI_RESPONSE: &str = "endMultiResponse";

/// Auto-buzz state as published on either topic.
pub fn auto_buzz_message(enabled: bool) -> &'static str {
    if enabled {
        MSG_AUTO_BUZZ_ON
    } else {
        MSG_AUTO_BUZZ_OFF
    }
}

/// Commands a client can send on [`TOPIC_CMD`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Open the door (buzzer relay).
    Buzz,
    AutoBuzzOn,
    AutoBuzzOff,
    /// Run a full ring, bell relay included, reported as a test ring.
    TestRing,
    GetActionLog,
    Ping,
    GetAutoBuzz,
    AckRing,
    /// Dump the captured raw ring-input windows.
    GetRawData,
    GetStartTime,
}

impl Command {
    pub const ALL: [Command; 10] = [
        Command::Buzz,
        Command::AutoBuzzOn,
        Command::AutoBuzzOff,
        Command::TestRing,
        Command::GetActionLog,
        Command::Ping,
        Command::GetAutoBuzz,
        Command::AckRing,
        Command::GetRawData,
        Command::GetStartTime,
    ];

    /// Exact, case-sensitive match on the wire name.
    pub fn parse(payload: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == payload)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Buzz => "buzz",
            Self::AutoBuzzOn => "autoBuzzOn",
            Self::AutoBuzzOff => "autoBuzzOff",
            Self::TestRing => "testRing",
            Self::GetActionLog => "getActionLog",
            Self::Ping => "ping",
            Self::GetAutoBuzz => "getAutoBuzz",
            Self::AckRing => "ackRing",
            Self::GetRawData => "getRawData",
            Self::GetStartTime => "getStartTime",
        }
    }

    /// Whether the device answers on [`TOPIC_RESPONSE`].
    pub fn needs_response(self) -> bool {
        matches!(
            self,
            Self::Ping
                | Self::Buzz
                | Self::GetRawData
                | Self::GetStartTime
                | Self::GetActionLog
                | Self::GetAutoBuzz
        )
    }

    /// Whether the answer spans several messages ending with
    /// [`MSG_END_MULTI_RESPONSE`].
    pub fn is_multi_response(self) -> bool {
        matches!(self, Self::GetActionLog | Self::GetRawData)
    }
}

impl core::fmt::Display for Command {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
