//! Automated player that speaks the same protocol as a human client

use crate::network::{Client, Player, SessionEnd};
use log::debug;
use rand::seq::SliceRandom;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

pub const BOT_NAMES: &[&str] = &[
    "BOT_columbus",
    "BOT_magellan",
    "BOT_cook",
    "BOT_vespucci",
    "BOT_hudson",
    "BOT_cabot",
    "BOT_drake",
    "BOT_marco_polo",
    "BOT_champlain",
    "BOT_cortes",
    "BOT_pizarro",
    "BOT_cartier",
    "BOT_la_salle",
    "BOT_park",
    "BOT_livingstone",
    "BOT_vasco_da_gama",
    "BOT_pedro_alvares_cabral",
    "BOT_zheng_he",
    "BOT_meriwether_lewis",
    "BOT_william_clark",
];

/// Picks a random bot name that is not already taken. Falls back to a
/// numbered name once every listed name is seated.
pub fn pick_bot_name(taken: &[&str]) -> String {
    let free: Vec<&str> = BOT_NAMES
        .iter()
        .copied()
        .filter(|name| !taken.contains(name))
        .collect();

    match free.choose(&mut rand::thread_rng()) {
        Some(name) => name.to_string(),
        None => format!("BOT_{}", taken.len() + 1),
    }
}

pub struct Bot {
    name: String,
    think_time: Duration,
}

impl Bot {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            think_time: Duration::ZERO,
        }
    }

    /// Delay before each answer
    pub fn with_think_time(mut self, think_time: Duration) -> Self {
        self.think_time = think_time;
        self
    }
}

impl Player for Bot {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_message(&mut self, line: &str) {
        debug!("{} <- {}", self.name, line);
    }

    fn answer(&mut self, _question: &str) -> impl Future<Output = String> + Send {
        let token = if rand::random::<bool>() { "1" } else { "0" };
        debug!("{} answered {}", self.name, token);

        let think_time = self.think_time;
        async move {
            if !think_time.is_zero() {
                tokio::time::sleep(think_time).await;
            }
            token.to_string()
        }
    }
}

/// Plays one session as a bot against the server at `server_addr`
pub async fn run_bot(name: String, server_addr: SocketAddr) -> io::Result<SessionEnd> {
    let mut bot = Bot::new(name);
    let end = Client::new(server_addr).play(&mut bot).await?;
    debug!("{} finished its session: {:?}", bot.name, end);
    Ok(end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{parse_answer, AnswerToken};

    #[tokio::test]
    async fn test_bot_answers_are_valid_tokens() {
        let mut bot = Bot::new("BOT_cook");

        for _ in 0..20 {
            let answer = bot.answer("True or False: anything").await;
            assert!(matches!(parse_answer(&answer), Some(AnswerToken::Value(_))));
        }
    }

    #[test]
    fn test_pick_bot_name_avoids_taken() {
        let taken: Vec<&str> = BOT_NAMES[1..].to_vec();

        assert_eq!(pick_bot_name(&taken), BOT_NAMES[0]);
    }

    #[test]
    fn test_pick_bot_name_when_exhausted() {
        let name = pick_bot_name(BOT_NAMES);

        assert!(name.starts_with("BOT_"));
        assert!(!BOT_NAMES.contains(&name.as_str()));
    }
}
