//! Outbound notices on the `doorRing` topic and reply framing.
//!
//! The device formats these; a client parses them back with
//! [`DoorRingMessage::parse`] and reassembles multi-line replies with
//! [`MultiResponse`].

use super::commands::{
    MSG_ACK_RING, MSG_AUTO_BUZZ_OFF, MSG_AUTO_BUZZ_ON, MSG_END_MULTI_RESPONSE, MSG_RING,
    MSG_TEST_RING,
};

const AUTO_BUZZ_NOTE: &str = "auto buzz, ";

/// Ring notice published on `doorRing`.
///
/// `"ring <time>"`, `"ring auto buzz, <time>"` or `"testRing <time>"`.
/// Test rings never carry the auto-buzz note.
pub fn ring_notice(test: bool, auto_buzz: bool, date_time: &str) -> String {
    let mut notice = String::from(ring_word(test));
    notice.push(' ');
    if auto_buzz && !test {
        notice.push_str(AUTO_BUZZ_NOTE);
    }
    notice.push_str(date_time);
    notice
}

/// Bare event word used in the action log.
pub fn ring_word(test: bool) -> &'static str {
    if test { MSG_TEST_RING } else { MSG_RING }
}

/// Action-log text for a buzz.
pub fn buzz_entry(auto: bool) -> &'static str {
    if auto { "buzz (auto)" } else { "buzz (manual)" }
}

/// A decoded `doorRing` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DoorRingMessage {
    Ring { auto_buzz: bool, date_time: String },
    TestRing { date_time: String },
    AckRing,
    AutoBuzz(bool),
}

impl DoorRingMessage {
    pub fn parse(payload: &str) -> Option<Self> {
        match payload {
            MSG_ACK_RING => return Some(Self::AckRing),
            MSG_AUTO_BUZZ_ON => return Some(Self::AutoBuzz(true)),
            MSG_AUTO_BUZZ_OFF => return Some(Self::AutoBuzz(false)),
            _ => {}
        }

        if let Some(rest) = word_suffix(payload, MSG_TEST_RING) {
            return Some(Self::TestRing {
                date_time: rest.to_owned(),
            });
        }
        let rest = word_suffix(payload, MSG_RING)?;
        match rest.strip_prefix(AUTO_BUZZ_NOTE) {
            Some(date_time) => Some(Self::Ring {
                auto_buzz: true,
                date_time: date_time.to_owned(),
            }),
            None => Some(Self::Ring {
                auto_buzz: false,
                date_time: rest.to_owned(),
            }),
        }
    }
}

/// `payload` is `word` alone or `word` followed by a space and a suffix.
fn word_suffix<'a>(payload: &'a str, word: &str) -> Option<&'a str> {
    let rest = payload.strip_prefix(word)?;
    if rest.is_empty() {
        return Some(rest);
    }
    rest.strip_prefix(' ')
}

/// Collects the lines of one multi-line reply.
#[derive(Debug, Default, Clone)]
pub struct MultiResponse {
    lines: Vec<String>,
    complete: bool,
}

impl MultiResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one reply payload. Returns `true` once the terminator arrived;
    /// later lines are ignored.
    pub fn push(&mut self, payload: &str) -> bool {
        if self.complete {
            return true;
        }
        if payload == MSG_END_MULTI_RESPONSE {
            self.complete = true;
        } else {
            self.lines.push(payload.to_owned());
        }
        self.complete
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}
