//! Participants and the active roster of a session
//!
//! A participant is one seat at the table, human or bot. The server owns its
//! TCP connection for as long as the participant is part of the session.
//! The roster only ever holds participants that are still playing; removal
//! hands the participant back to the caller, who decides whether it is
//! kept around as eliminated or closed as disconnected.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

/// Unique within a session and never reused
pub type ParticipantId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Accepted, display name not yet received
    Joining,
    Active,
    Eliminated,
    Disconnected,
}

#[derive(Debug)]
pub struct Participant {
    pub id: ParticipantId,
    /// Supplied by the peer and not validated
    pub name: String,
    pub addr: SocketAddr,
    pub status: Status,
    stream: TcpStream,
}

impl Participant {
    pub fn new(id: ParticipantId, stream: TcpStream, addr: SocketAddr) -> Self {
        Self {
            id,
            name: String::new(),
            addr,
            status: Status::Joining,
            stream,
        }
    }

    pub fn stream(&self) -> &TcpStream {
        &self.stream
    }

    pub fn stream_mut(&mut self) -> &mut TcpStream {
        &mut self.stream
    }

    /// Shuts the connection down and drops it
    pub async fn close(mut self) {
        let _ = self.stream.shutdown().await;
    }
}

/// Currently active participants, iterated in id order
#[derive(Debug, Default)]
pub struct Roster {
    participants: BTreeMap<ParticipantId, Participant>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seats a participant and marks it active
    pub fn insert(&mut self, mut participant: Participant) {
        participant.status = Status::Active;
        self.participants.insert(participant.id, participant);
    }

    /// Takes a participant out of the roster. Returns `None` if it already left.
    pub fn remove(&mut self, id: ParticipantId) -> Option<Participant> {
        self.participants.remove(&id)
    }

    pub fn get(&self, id: ParticipantId) -> Option<&Participant> {
        self.participants.get(&id)
    }

    pub fn contains(&self, id: ParticipantId) -> bool {
        self.participants.contains_key(&id)
    }

    pub fn name_of(&self, id: ParticipantId) -> Option<&str> {
        self.participants.get(&id).map(|p| p.name.as_str())
    }

    pub fn ids(&self) -> Vec<ParticipantId> {
        self.participants.keys().copied().collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.participants.values().map(|p| p.name.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Participant> {
        self.participants.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Participant> {
        self.participants.values_mut()
    }

    /// Empties the roster, yielding every participant in id order
    pub fn drain(&mut self) -> Vec<Participant> {
        std::mem::take(&mut self.participants).into_values().collect()
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::participant;

    #[tokio::test]
    async fn test_participant_creation() {
        let (p, _peer) = participant(1, "").await;

        assert_eq!(p.id, 1);
        assert_eq!(p.status, Status::Joining);
        assert!(p.name.is_empty());
    }

    #[tokio::test]
    async fn test_insert_marks_active() {
        let mut roster = Roster::new();
        let (p, _peer) = participant(1, "ruby").await;

        roster.insert(p);

        assert_eq!(roster.len(), 1);
        assert_eq!(roster.get(1).unwrap().status, Status::Active);
        assert_eq!(roster.name_of(1), Some("ruby"));
    }

    #[tokio::test]
    async fn test_iteration_in_id_order() {
        let mut roster = Roster::new();
        let (p3, _a) = participant(3, "c").await;
        let (p1, _b) = participant(1, "a").await;
        let (p2, _c) = participant(2, "b").await;

        roster.insert(p3);
        roster.insert(p1);
        roster.insert(p2);

        assert_eq!(roster.ids(), vec![1, 2, 3]);
        assert_eq!(roster.names(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_remove() {
        let mut roster = Roster::new();
        let (p, _peer) = participant(7, "ruby").await;
        roster.insert(p);

        let removed = roster.remove(7).unwrap();
        assert_eq!(removed.id, 7);
        assert!(roster.is_empty());
        assert!(!roster.contains(7));
    }

    #[tokio::test]
    async fn test_remove_nonexistent() {
        let mut roster = Roster::new();

        assert!(roster.remove(999).is_none());
        assert_eq!(roster.len(), 0);
    }

    #[tokio::test]
    async fn test_drain_empties_roster() {
        let mut roster = Roster::new();
        let (p1, _a) = participant(1, "a").await;
        let (p2, _b) = participant(2, "b").await;
        roster.insert(p2);
        roster.insert(p1);

        let drained = roster.drain();

        assert!(roster.is_empty());
        assert_eq!(drained.iter().map(|p| p.id).collect::<Vec<_>>(), vec![1, 2]);
    }
}
