//! One game's worth of state, and the loop that runs game after game
//!
//! A [`Session`] is created empty when a lobby opens and is closed once its
//! game reaches an outcome. Nothing about a finished session survives into
//! the next one apart from the leaderboard.

use crate::bots::BotSpawner;
use crate::error::ServerError;
use crate::game::{Outcome, Phase, RoundEngine};
use crate::lobby::LobbyManager;
use crate::network::probe_liveness;
use crate::questions::Question;
use crate::roster::{Participant, ParticipantId, Roster, Status};
use crate::scores::ScoreStore;
use log::info;
use std::time::Duration;

#[derive(Debug)]
pub struct Session {
    pub number: u64,
    pub roster: Roster,
    pub phase: Phase,
    /// Still connected so they can hear the final outcome
    eliminated: Vec<Participant>,
    never_joined: Vec<ParticipantId>,
    questions: Vec<Question>,
    next_question: usize,
    round: u32,
    next_id: ParticipantId,
}

impl Session {
    pub fn new(number: u64, questions: Vec<Question>) -> Self {
        Self {
            number,
            roster: Roster::new(),
            phase: Phase::Lobby,
            eliminated: Vec::new(),
            never_joined: Vec::new(),
            questions,
            next_question: 0,
            round: 0,
            next_id: 1,
        }
    }

    /// Hands out the next participant id; ids are never reused
    pub fn allocate_id(&mut self) -> ParticipantId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn mark_never_joined(&mut self, id: ParticipantId) {
        self.never_joined.push(id);
    }

    pub fn never_joined(&self) -> &[ParticipantId] {
        &self.never_joined
    }

    /// Takes the next question in order, or `None` once all were asked
    pub fn next_question(&mut self) -> Option<Question> {
        let question = self.questions.get(self.next_question).cloned()?;
        self.next_question += 1;
        Some(question)
    }

    pub fn remaining_questions(&self) -> usize {
        self.questions.len() - self.next_question
    }

    /// Advances the round counter and returns the new round number
    pub fn begin_round(&mut self) -> u32 {
        self.round += 1;
        self.round
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    /// Moves the given participants out of the roster and into the
    /// eliminated list. Returns the ones that were actually moved.
    pub fn eliminate(&mut self, ids: &[ParticipantId]) -> &mut [Participant] {
        let start = self.eliminated.len();
        for &id in ids {
            if let Some(mut participant) = self.roster.remove(id) {
                participant.status = Status::Eliminated;
                self.eliminated.push(participant);
            }
        }
        &mut self.eliminated[start..]
    }

    /// Removes a participant and closes its connection. Returns its name if
    /// it was still in the roster.
    pub async fn disconnect(&mut self, id: ParticipantId) -> Option<String> {
        let mut participant = self.roster.remove(id)?;
        participant.status = Status::Disconnected;
        let name = participant.name.clone();
        participant.close().await;
        Some(name)
    }

    /// Probes the whole roster and disconnects everyone who is gone.
    /// Returns the names of the dropped participants.
    pub async fn drop_unreachable(&mut self, window: Duration) -> Vec<String> {
        let unreachable = probe_liveness(self.roster.iter_mut(), window).await;

        let mut dropped = Vec::new();
        for id in unreachable {
            if let Some(name) = self.disconnect(id).await {
                info!("{} is no longer reachable", name);
                dropped.push(name);
            }
        }
        dropped
    }

    pub fn eliminated(&self) -> &[Participant] {
        &self.eliminated
    }

    /// Everyone who is still connected, active or eliminated
    pub fn everyone_mut(&mut self) -> impl Iterator<Item = &mut Participant> {
        self.roster.iter_mut().chain(self.eliminated.iter_mut())
    }

    /// Closes every connection the session still holds
    pub async fn close(&mut self) {
        let participants: Vec<Participant> = self
            .roster
            .drain()
            .into_iter()
            .chain(self.eliminated.drain(..))
            .collect();

        for participant in participants {
            participant.close().await;
        }
    }
}

/// Runs lobby and game back to back, forever
pub struct SessionLoop<B, S> {
    lobby: LobbyManager<B>,
    scores: S,
    questions: Vec<Question>,
    sessions_started: u64,
}

impl<B: BotSpawner, S: ScoreStore> SessionLoop<B, S> {
    pub fn new(lobby: LobbyManager<B>, scores: S, questions: Vec<Question>) -> Self {
        Self {
            lobby,
            scores,
            questions,
            sessions_started: 0,
        }
    }

    pub fn scores(&self) -> &S {
        &self.scores
    }

    pub async fn run(&mut self) -> Result<(), ServerError> {
        loop {
            match self.run_once().await? {
                Some(outcome) => info!("Game over ({}), sending out offer requests...", outcome),
                None => info!("Lobby closed without players, reopening"),
            }
        }
    }

    /// Forms one roster and plays it to an outcome. Returns `None` when the
    /// lobby closed empty. Every connection is closed before returning.
    pub async fn run_once(&mut self) -> Result<Option<Outcome>, ServerError> {
        self.sessions_started += 1;
        let mut session = Session::new(self.sessions_started, self.questions.clone());
        info!("Session {} started, waiting for players", session.number);

        let result = self.play(&mut session).await;
        session.close().await;
        result
    }

    async fn play(&mut self, session: &mut Session) -> Result<Option<Outcome>, ServerError> {
        let config = self.lobby.config().clone();
        self.lobby.form_roster(session, config.min_table_size).await?;

        if session.roster.is_empty() {
            return Ok(None);
        }

        let outcome = RoundEngine::new(&config, &mut self.scores)
            .play(session)
            .await;
        Ok(Some(outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::participant;
    use tokio::io::AsyncReadExt;

    fn questions() -> Vec<Question> {
        vec![Question::new("a", true), Question::new("b", false)]
    }

    #[test]
    fn test_ids_never_reused() {
        let mut session = Session::new(1, questions());

        let ids: Vec<_> = (0..3).map(|_| session.allocate_id()).collect();

        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_questions_in_order() {
        let mut session = Session::new(1, questions());

        assert_eq!(session.next_question().unwrap().statement, "a");
        assert_eq!(session.remaining_questions(), 1);
        assert_eq!(session.next_question().unwrap().statement, "b");
        assert!(session.next_question().is_none());
        assert_eq!(session.remaining_questions(), 0);
    }

    #[tokio::test]
    async fn test_eliminate_moves_out_of_roster() {
        let mut session = Session::new(1, questions());
        let (a, _pa) = participant(1, "a").await;
        let (b, _pb) = participant(2, "b").await;
        session.roster.insert(a);
        session.roster.insert(b);

        let out = session.eliminate(&[2, 99]);

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].status, Status::Eliminated);
        assert!(!session.roster.contains(2));
        assert_eq!(session.eliminated().len(), 1);
        assert_eq!(session.everyone_mut().count(), 2);
    }

    #[tokio::test]
    async fn test_disconnect_closes_connection() {
        let mut session = Session::new(1, questions());
        let (a, mut pa) = participant(1, "a").await;
        session.roster.insert(a);

        assert_eq!(session.disconnect(1).await.as_deref(), Some("a"));
        assert!(session.disconnect(1).await.is_none());

        let mut buf = [0u8; 1];
        assert_eq!(pa.read(&mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_drop_unreachable() {
        let mut session = Session::new(1, questions());
        let (a, _pa) = participant(1, "a").await;
        let (b, pb) = participant(2, "b").await;
        session.roster.insert(a);
        session.roster.insert(b);
        drop(pb);
        tokio::time::sleep(Duration::from_millis(20)).await;

        let dropped = session.drop_unreachable(Duration::from_millis(50)).await;

        assert_eq!(dropped, vec!["b".to_string()]);
        assert_eq!(session.roster.ids(), vec![1]);
    }

    #[tokio::test]
    async fn test_close_releases_everyone() {
        let mut session = Session::new(1, questions());
        let (a, mut pa) = participant(1, "a").await;
        let (b, mut pb) = participant(2, "b").await;
        session.roster.insert(a);
        session.roster.insert(b);
        session.eliminate(&[2]);

        session.close().await;

        assert!(session.roster.is_empty());
        assert!(session.eliminated().is_empty());
        let mut buf = [0u8; 1];
        assert_eq!(pa.read(&mut buf).await.unwrap(), 0);
        assert_eq!(pb.read(&mut buf).await.unwrap(), 0);
    }
}
