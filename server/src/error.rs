//! Error types for the trivia server

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Failure talking to one participant. Never crosses a fan-out boundary;
/// workers turn it into a per-participant marker.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("write timed out after {0:?}")]
    WriteTimeout(Duration),
    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("leaderboard file error: {0}")]
    Io(#[from] io::Error),
    #[error("leaderboard format error: {0}")]
    Format(#[from] serde_json::Error),
}

/// Why a new connection never became an active participant
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("peer closed before sending a name")]
    Closed,
    #[error("no name received within {0:?}")]
    TimedOut(Duration),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl From<io::Error> for RegistrationError {
    fn from(e: io::Error) -> Self {
        RegistrationError::Transport(TransportError::Io(e))
    }
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("could not bind {addr} after {attempts} attempts: {source}")]
    Bind {
        addr: String,
        attempts: u32,
        source: io::Error,
    },
    #[error("could not encode offer: {0}")]
    Offer(#[from] shared::OfferError),
    #[error(transparent)]
    Io(#[from] io::Error),
}
