//! The round engine: one game from the first question to the outcome
//!
//! A game moves through `Lobby -> InRound -> Adjudicating -> (InRound | GameOver)`.
//! Each round broadcasts the question to the whole roster, then collects
//! every answer concurrently. The roster is only changed between phases,
//! never while a fan-out is in flight.
//!
//! Elimination rule: if everyone was right, or everyone was wrong, nobody
//! leaves. Otherwise everyone who was not right is out.

use crate::answers::{collect_answers, discard_stale_answers, RoundVerdict, Verdict};
use crate::config::ServerConfig;
use crate::network::{fan_out, send_text, send_to_all};
use crate::questions::Question;
use crate::roster::{ParticipantId, Roster};
use crate::scores::ScoreStore;
use crate::session::Session;
use log::{debug, info, warn};
use shared::question_line;
use std::fmt;
use std::time::Duration;
use tokio::time::sleep;

const NOBODY_ELIMINATED: &str = "Nobody is eliminated this round! Let's move to the next round.\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Lobby,
    InRound,
    Adjudicating,
    GameOver,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Winner { id: ParticipantId, name: String },
    /// Two or more players were still standing when the questions ran out
    Tie { names: Vec<String> },
    Empty,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Winner { name, .. } => write!(f, "winner {}", name),
            Outcome::Tie { names } => write!(f, "tie between {}", names.join(", ")),
            Outcome::Empty => write!(f, "no players left"),
        }
    }
}

/// Who leaves the roster after a round, and why
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Adjudication {
    pub eliminated: Vec<(ParticipantId, Verdict)>,
}

impl Adjudication {
    pub fn is_noop(&self) -> bool {
        self.eliminated.is_empty()
    }
}

pub fn adjudicate(verdicts: &RoundVerdict) -> Adjudication {
    let correct = verdicts.values().filter(|v| v.is_correct()).count();
    if correct == 0 || correct == verdicts.len() {
        return Adjudication::default();
    }

    Adjudication {
        eliminated: verdicts
            .iter()
            .filter(|(_, verdict)| !verdict.is_correct())
            .map(|(&id, &verdict)| (id, verdict))
            .collect(),
    }
}

/// One line per player. In a two-player round the correct player is also
/// named the winner.
pub fn results_message(roster: &Roster, verdicts: &RoundVerdict) -> String {
    let head_to_head = roster.len() <= 2;

    let mut message = String::new();
    for (&id, verdict) in verdicts {
        let Some(name) = roster.name_of(id) else {
            continue;
        };
        if head_to_head && verdict.is_correct() {
            message.push_str(&format!("{} {} {} wins!\n", name, verdict.describe(), name));
        } else {
            message.push_str(&format!("{} {}\n", name, verdict.describe()));
        }
    }
    message
}

pub fn decide_outcome(roster: &Roster) -> Outcome {
    match roster.len() {
        0 => Outcome::Empty,
        1 => match roster.iter().next() {
            Some(p) => Outcome::Winner {
                id: p.id,
                name: p.name.clone(),
            },
            None => Outcome::Empty,
        },
        _ => Outcome::Tie {
            names: roster.names().into_iter().map(String::from).collect(),
        },
    }
}

pub struct RoundEngine<'a, S> {
    config: &'a ServerConfig,
    scores: &'a mut S,
}

impl<'a, S: ScoreStore> RoundEngine<'a, S> {
    pub fn new(config: &'a ServerConfig, scores: &'a mut S) -> Self {
        Self { config, scores }
    }

    /// Plays rounds until an outcome is reached and announces it to everyone
    /// who took part, eliminated players included.
    pub async fn play(&mut self, session: &mut Session) -> Outcome {
        self.send_preamble(session).await;

        loop {
            self.drop_unreachable(session).await;
            if session.roster.len() < 2 {
                break;
            }

            let Some(question) = session.next_question() else {
                break;
            };

            session.phase = Phase::InRound;
            let eliminated_any = self.play_round(session, &question).await;

            self.drop_unreachable(session).await;
            if eliminated_any && session.roster.len() == 1 {
                break;
            }
        }

        session.phase = Phase::GameOver;
        let outcome = decide_outcome(&session.roster);
        info!("Session {} ended after {} rounds: {}", session.number, session.round(), outcome);
        self.announce_outcome(session, &outcome).await;
        outcome
    }

    async fn send_preamble(&mut self, session: &mut Session) {
        let welcome = format!(
            "Welcome to {} Server, where we are answering trivia questions about geography!\n",
            self.config.server_name
        );
        self.broadcast(session, &welcome).await;
        self.broadcast(session, "Loading game...\n").await;
        pause(self.config.pacing.lobby_settle).await;

        let mut players = String::new();
        for (i, name) in session.roster.names().iter().enumerate() {
            players.push_str(&format!("Player {}: {}\n", i + 1, name));
        }
        players.push_str("===============\n");
        self.broadcast(session, &players).await;
    }

    /// Runs one round. Returns whether anyone left the roster by adjudication.
    async fn play_round(&mut self, session: &mut Session, question: &Question) -> bool {
        let round = session.begin_round();
        let announcement = format!(
            "Round {}, played by {}:\n",
            round,
            session.roster.names().join(", ")
        );
        info!("{}", announcement.trim_end());

        let mut failed = self.broadcast(session, &announcement).await;
        pause(self.config.pacing.round_intro).await;
        discard_stale_answers(session.roster.iter_mut()).await;
        failed.extend(self.broadcast(session, &question_line(&question.statement)).await);

        let mut verdicts = collect_answers(
            session.roster.iter_mut(),
            question,
            self.config.answer_deadline,
        )
        .await;
        for id in failed {
            verdicts.insert(id, Verdict::Disconnected);
        }

        session.phase = Phase::Adjudicating;
        for (&id, verdict) in &verdicts {
            debug!(
                "Round {}: {} {}",
                round,
                session.roster.name_of(id).unwrap_or("?"),
                verdict.describe()
            );
        }

        let adjudication = adjudicate(&verdicts);
        if adjudication.is_noop() {
            self.broadcast(session, NOBODY_ELIMINATED).await;
            pause(self.config.pacing.between_rounds).await;
            return false;
        }

        pause(self.config.pacing.results).await;
        let results = results_message(&session.roster, &verdicts);
        self.broadcast(session, &results).await;
        pause(self.config.pacing.between_rounds).await;

        let mut out = Vec::new();
        for (id, verdict) in adjudication.eliminated {
            if verdict == Verdict::Disconnected {
                if let Some(name) = session.disconnect(id).await {
                    info!("{} disconnected during round {}", name, round);
                }
            } else {
                out.push(id);
            }
        }

        let write_timeout = self.config.write_timeout;
        let notices = fan_out(session.eliminate(&out).iter_mut(), |participant| async move {
            info!("{} is out of the game", participant.name);
            let notice = format!(
                "Sorry {}, you are out of the game!\nPlease wait for the final results.\n",
                participant.name
            );
            send_text(participant.stream_mut(), &notice, write_timeout).await
        })
        .await;
        for (id, result) in notices {
            if let Err(e) = result {
                debug!("Elimination notice to {} not delivered: {}", id, e);
            }
        }

        true
    }

    /// Drops players whose connection silently died and tells the rest
    async fn drop_unreachable(&mut self, session: &mut Session) {
        let dropped = session.drop_unreachable(self.config.probe_window).await;
        for name in dropped {
            let notice = format!("{} has disconnected from the game.\n", name);
            self.broadcast(session, &notice).await;
        }
    }

    async fn announce_outcome(&mut self, session: &mut Session, outcome: &Outcome) {
        let message = match outcome {
            Outcome::Winner { name, .. } => {
                pause(self.config.pacing.results).await;
                format!(
                    "Game over!\nCongratulations to the winner: {}\nAll Time Rankings\n{}",
                    name,
                    self.rankings(name)
                )
            }
            Outcome::Tie { names } => {
                format!("Game is tied !\nStill standing: {}\n", names.join(", "))
            }
            Outcome::Empty => "Game is tied !\nNo players left in the game.\n".to_string(),
        };

        let failed = send_to_all(session.everyone_mut(), &message, self.config.write_timeout).await;
        if !failed.is_empty() {
            debug!("Outcome not delivered to {} participants", failed.len());
        }
    }

    /// Records the win and renders the top of the leaderboard
    fn rankings(&mut self, winner: &str) -> String {
        if let Err(e) = self.scores.record_win(winner) {
            warn!("Failed to record win for {}: {}", winner, e);
        }

        match self.scores.top_n(self.config.leaderboard_size) {
            Ok(top) => top
                .iter()
                .enumerate()
                .map(|(i, (name, wins))| format!("{}. {} - {} wins\n", i + 1, name, wins))
                .collect(),
            Err(e) => {
                warn!("Failed to read leaderboard: {}", e);
                String::new()
            }
        }
    }

    async fn broadcast(&self, session: &mut Session, message: &str) -> Vec<ParticipantId> {
        send_to_all(session.roster.iter_mut(), message, self.config.write_timeout)
            .await
            .into_iter()
            .collect()
    }
}

async fn pause(duration: Duration) {
    if !duration.is_zero() {
        sleep(duration).await;
    }
}
