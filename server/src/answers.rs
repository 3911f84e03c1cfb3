//! Answer collection and per-round verdicts

use crate::network::fan_out;
use crate::questions::Question;
use crate::roster::{Participant, ParticipantId};
use log::debug;
use shared::{parse_answer, AnswerToken, MAX_MESSAGE_LEN};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::time::timeout;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Correct,
    Incorrect,
    TimedOut,
    InvalidInput,
    Disconnected,
}

impl Verdict {
    pub fn is_correct(self) -> bool {
        self == Verdict::Correct
    }

    /// Wording used in the round results listing
    pub fn describe(self) -> &'static str {
        match self {
            Verdict::Correct => "is correct!",
            Verdict::Incorrect => "is incorrect!",
            Verdict::TimedOut => "did not answer in time !",
            Verdict::InvalidInput => "gave an invalid input !",
            Verdict::Disconnected => "has disconnected.",
        }
    }
}

/// One verdict per participant of a round
pub type RoundVerdict = BTreeMap<ParticipantId, Verdict>;

/// Classifies the bytes of one read against the ground truth. An empty read
/// means the peer closed its side.
pub fn classify(raw: &[u8], truth: bool) -> Verdict {
    if raw.is_empty() {
        return Verdict::Disconnected;
    }

    match parse_answer(&String::from_utf8_lossy(raw)) {
        Some(AnswerToken::Value(answer)) if answer == truth => Verdict::Correct,
        Some(AnswerToken::Value(_)) => Verdict::Incorrect,
        Some(AnswerToken::Unanswered) => Verdict::TimedOut,
        None => Verdict::InvalidInput,
    }
}

/// Reads a single answer, waiting at most `deadline`
pub async fn read_answer(stream: &mut TcpStream, truth: bool, deadline: Duration) -> Verdict {
    let mut buffer = [0u8; MAX_MESSAGE_LEN];

    match timeout(deadline, stream.read(&mut buffer)).await {
        Err(_) => Verdict::TimedOut,
        Ok(Ok(n)) => classify(&buffer[..n], truth),
        Ok(Err(_)) => Verdict::Disconnected,
    }
}

/// Throws away whatever the peer has sent since the last read without
/// waiting for more. Returns the number of bytes dropped. Stops at EOF so a
/// closed peer still reads as disconnected afterwards.
pub fn discard_pending(stream: &TcpStream) -> usize {
    let mut buffer = [0u8; MAX_MESSAGE_LEN];
    let mut discarded = 0;

    loop {
        match stream.try_read(&mut buffer) {
            Ok(0) => return discarded,
            Ok(n) => discarded += n,
            // WouldBlock once the buffer is empty
            Err(_) => return discarded,
        }
    }
}

/// Clears late answers to an earlier question from every participant, so the
/// next pass only sees replies to the question about to be asked.
pub async fn discard_stale_answers<'a, I>(participants: I)
where
    I: IntoIterator<Item = &'a mut Participant>,
{
    let discarded = fan_out(participants, |participant| async move {
        discard_pending(participant.stream())
    })
    .await;

    for (id, bytes) in discarded.into_iter().filter(|(_, bytes)| *bytes > 0) {
        debug!("Discarded {} stale bytes from player {}", bytes, id);
    }
}

/// Reads one answer from every participant at once. Returns when every
/// participant has answered or hit the deadline.
pub async fn collect_answers<'a, I>(
    participants: I,
    question: &Question,
    deadline: Duration,
) -> RoundVerdict
where
    I: IntoIterator<Item = &'a mut Participant>,
{
    let truth = question.truth;
    fan_out(participants, |participant| async move {
        read_answer(participant.stream_mut(), truth, deadline).await
    })
    .await
}
