//! Concurrent per-participant I/O
//!
//! Every phase that touches all participants at once (broadcasting, answer
//! collection, liveness probing) goes through [`fan_out`]: one worker per
//! participant, all joined before the call returns. Each worker writes only
//! its own participant's entry in the result map, and a failing worker never
//! affects its siblings.
//!
//! Workers are polled together on the calling task rather than spawned. Each
//! one only ever waits on its own socket or its own timer, so a peer that
//! stops reading or writing parks its worker without holding up the rest,
//! and every deadline is a real timer that fires on schedule. Workers borrow
//! their participant for the length of the call, which a spawned task could
//! not do.

use crate::error::TransportError;
use crate::roster::{Participant, ParticipantId};
use futures::future::join_all;
use log::debug;
use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::io;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Runs `worker` against every participant concurrently and waits for all
/// of them. Results are keyed by participant id.
pub async fn fan_out<'a, I, F, Fut, R>(participants: I, worker: F) -> BTreeMap<ParticipantId, R>
where
    I: IntoIterator<Item = &'a mut Participant>,
    F: Fn(&'a mut Participant) -> Fut,
    Fut: Future<Output = R>,
{
    let workers = participants.into_iter().map(|participant| {
        let id = participant.id;
        let work = worker(participant);
        async move { (id, work.await) }
    });

    join_all(workers).await.into_iter().collect()
}

/// Writes `text` in full, giving up after `write_timeout`
pub async fn send_text(
    stream: &mut TcpStream,
    text: &str,
    write_timeout: Duration,
) -> Result<(), TransportError> {
    match timeout(write_timeout, stream.write_all(text.as_bytes())).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(TransportError::WriteTimeout(write_timeout)),
    }
}

/// Sends the same message to every participant at once. Returns the ids
/// whose send failed; those are suspected disconnected.
pub async fn send_to_all<'a, I>(
    participants: I,
    message: &str,
    write_timeout: Duration,
) -> BTreeSet<ParticipantId>
where
    I: IntoIterator<Item = &'a mut Participant>,
{
    let results = fan_out(participants, |participant| async move {
        send_text(participant.stream_mut(), message, write_timeout).await
    })
    .await;

    results
        .into_iter()
        .filter_map(|(id, result)| match result {
            Ok(()) => None,
            Err(e) => {
                debug!("Send to participant {} failed: {}", id, e);
                Some(id)
            }
        })
        .collect()
}

/// Checks whether the peer behind `stream` is still there.
///
/// A pending socket error or a failing zero-byte send means the connection
/// was reset. A peer that closed its end shows up as EOF when peeking; if
/// nothing arrives within `window` the connection is taken as alive.
pub async fn is_reachable(stream: &TcpStream, window: Duration) -> bool {
    if !matches!(stream.take_error(), Ok(None)) {
        return false;
    }

    if let Err(e) = stream.try_write(&[]) {
        if e.kind() != io::ErrorKind::WouldBlock {
            return false;
        }
    }

    let mut byte = [0u8; 1];
    match timeout(window, stream.peek(&mut byte)).await {
        Err(_) => true,
        Ok(Ok(0)) => false,
        Ok(Ok(_)) => true,
        Ok(Err(_)) => false,
    }
}

/// Probes every participant at once and returns the unreachable ids
pub async fn probe_liveness<'a, I>(participants: I, window: Duration) -> BTreeSet<ParticipantId>
where
    I: IntoIterator<Item = &'a mut Participant>,
{
    fan_out(participants, |participant| async move {
        is_reachable(participant.stream(), window).await
    })
    .await
    .into_iter()
    .filter(|(_, reachable)| !reachable)
    .map(|(id, _)| id)
    .collect()
}
