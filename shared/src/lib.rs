//! Wire protocol shared by the trivia server, the console client and the bots.
//!
//! Two transports are involved:
//! - a fixed 39-byte UDP offer datagram that advertises the server's TCP port
//! - free-text TCP messages, where only a few line prefixes carry meaning

use bincode::Options;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MAGIC_COOKIE: u32 = 0xabcd_dcba;
pub const MESSAGE_TYPE_OFFER: u8 = 0x2;
pub const DISCOVERY_PORT: u16 = 13117;
pub const SERVER_NAME_LEN: usize = 32;
/// cookie (4) + type (1) + name (32) + port (2)
pub const OFFER_LEN: usize = 4 + 1 + SERVER_NAME_LEN + 2;

pub const QUESTION_PREFIX: &str = "True or False:";
pub const GAME_OVER_PREFIX: &str = "Game over";
pub const GAME_TIED_PREFIX: &str = "Game is tied";
pub const LOBBY_WAIT_MESSAGE: &str = "Please wait for other players to join...\n";

/// Token a client sends when its own answer deadline elapsed
pub const NO_ANSWER_TOKEN: &str = "NONE";

/// Largest single read the server performs for names and answers
pub const MAX_MESSAGE_LEN: usize = 1024;

#[derive(Debug, Error)]
pub enum OfferError {
    #[error("offer datagram too short: {0} bytes")]
    TooShort(usize),
    #[error("unexpected magic cookie {0:#010x}")]
    BadCookie(u32),
    #[error("unexpected message type {0:#04x}")]
    BadMessageType(u8),
    #[error("malformed offer frame: {0}")]
    Frame(#[from] bincode::Error),
}

#[derive(Debug, Serialize, Deserialize)]
struct OfferFrame {
    magic_cookie: u32,
    message_type: u8,
    server_name: [u8; SERVER_NAME_LEN],
    tcp_port: u16,
}

fn frame_codec() -> impl Options {
    bincode::DefaultOptions::new()
        .with_big_endian()
        .with_fixint_encoding()
        .allow_trailing_bytes()
}

/// Server advertisement carried by the discovery beacon
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Offer {
    pub server_name: String,
    pub tcp_port: u16,
}

impl Offer {
    pub fn new(server_name: impl Into<String>, tcp_port: u16) -> Self {
        Self {
            server_name: server_name.into(),
            tcp_port,
        }
    }

    /// Encodes the offer into its fixed layout. Names longer than 32 bytes are
    /// cut at the last UTF-8 boundary that fits; shorter names are NUL padded.
    pub fn encode(&self) -> Result<Vec<u8>, OfferError> {
        let mut server_name = [0u8; SERVER_NAME_LEN];
        let mut end = self.server_name.len().min(SERVER_NAME_LEN);
        while !self.server_name.is_char_boundary(end) {
            end -= 1;
        }
        server_name[..end].copy_from_slice(&self.server_name.as_bytes()[..end]);

        let frame = OfferFrame {
            magic_cookie: MAGIC_COOKIE,
            message_type: MESSAGE_TYPE_OFFER,
            server_name,
            tcp_port: self.tcp_port,
        };
        Ok(frame_codec().serialize(&frame)?)
    }

    /// Decodes an offer datagram. The cookie and type tag are verified before
    /// the rest of the frame is looked at.
    pub fn decode(datagram: &[u8]) -> Result<Self, OfferError> {
        if datagram.len() < OFFER_LEN {
            return Err(OfferError::TooShort(datagram.len()));
        }

        let cookie = u32::from_be_bytes([datagram[0], datagram[1], datagram[2], datagram[3]]);
        if cookie != MAGIC_COOKIE {
            return Err(OfferError::BadCookie(cookie));
        }
        if datagram[4] != MESSAGE_TYPE_OFFER {
            return Err(OfferError::BadMessageType(datagram[4]));
        }

        let frame: OfferFrame = frame_codec().deserialize(&datagram[..OFFER_LEN])?;
        let name_end = frame
            .server_name
            .iter()
            .rposition(|&b| b != 0)
            .map_or(0, |last| last + 1);

        Ok(Self {
            server_name: String::from_utf8_lossy(&frame.server_name[..name_end]).into_owned(),
            tcp_port: frame.tcp_port,
        })
    }
}

/// A recognised answer token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerToken {
    Value(bool),
    /// The client gave up waiting for its player
    Unanswered,
}

/// Normalises a raw answer (trimmed, case-insensitive) through the alias
/// table. Returns `None` for anything outside the table.
pub fn parse_answer(raw: &str) -> Option<AnswerToken> {
    match raw.trim().to_ascii_uppercase().as_str() {
        "1" | "Y" | "T" => Some(AnswerToken::Value(true)),
        "0" | "N" | "F" => Some(AnswerToken::Value(false)),
        NO_ANSWER_TOKEN => Some(AnswerToken::Unanswered),
        _ => None,
    }
}

/// How a client should react to one line of server text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerLine<'a> {
    Question(&'a str),
    SessionEnded(&'a str),
    Info(&'a str),
}

pub fn classify_line(line: &str) -> ServerLine<'_> {
    if line.starts_with(QUESTION_PREFIX) {
        ServerLine::Question(line)
    } else if line.starts_with(GAME_OVER_PREFIX) || line.starts_with(GAME_TIED_PREFIX) {
        ServerLine::SessionEnded(line)
    } else {
        ServerLine::Info(line)
    }
}

pub fn question_line(statement: &str) -> String {
    format!("{} {}\n", QUESTION_PREFIX, statement)
}
