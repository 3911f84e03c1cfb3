//! # Trivia Server Library
//!
//! This library provides the server side of the LAN true/false trivia game.
//! It advertises itself on the local network, gathers players into a lobby,
//! fills empty seats with bots and runs elimination rounds until a single
//! winner, a tie, or an empty table remains. Then it starts over.
//!
//! ## Core Responsibilities
//!
//! ### Discovery
//! A beacon broadcasts a fixed 39-byte offer once per second for the whole
//! life of the process. Clients read the TCP port from it and connect.
//!
//! ### Lobby
//! Accepts connections until nobody new has arrived for the idle timeout,
//! reads each player's display name, and seats bots one by one when fewer
//! humans than the minimum table size showed up.
//!
//! ### Rounds
//! Every round sends the same question to all players at once, then reads
//! all answers at once under a hard deadline. Verdicts are adjudicated only
//! after every participant has been heard from or timed out.
//!
//! ## Architecture Design
//!
//! ### Fan-out with a join barrier
//! Broadcasting, answer collection and liveness probing share one primitive,
//! [`network::fan_out`]: a worker per participant, all awaited together.
//! Workers only write their own participant's result, so a failing peer
//! shows up as a marker in the result map and never disturbs the others.
//!
//! ### Session ownership
//! All per-game state lives in a [`session::Session`] owned by the
//! [`session::SessionLoop`]. The lobby and the round engine borrow it in
//! turn; nothing outlives the session except the leaderboard.
//!
//! ### Bots are ordinary clients
//! A bot connects over loopback and speaks exactly the protocol a human
//! client does. The server never treats it differently once seated.
//!
//! ## Module Organization
//!
//! - `answers`: answer classification and concurrent collection
//! - `beacon`: UDP offer broadcasting
//! - `bots`: seam for launching bots
//! - `config`: tunables and their defaults
//! - `error`: error types
//! - `game`: round engine, elimination rule and outcomes
//! - `lobby`: listener, registration and bot fill
//! - `network`: fan-out, broadcasting and liveness probing
//! - `questions`: the question set
//! - `roster`: participants and the active roster
//! - `scores`: leaderboard storage
//! - `session`: per-game state and the outer loop
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::bots::InProcessBots;
//! use server::config::ServerConfig;
//! use server::lobby::LobbyManager;
//! use server::questions::geography;
//! use server::scores::MemoryScores;
//! use server::session::SessionLoop;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::default();
//!     let lobby = LobbyManager::bind(&config, InProcessBots).await?;
//!
//!     // Lobby, game, teardown, repeat
//!     SessionLoop::new(lobby, MemoryScores::default(), geography())
//!         .run()
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

pub mod answers;
pub mod beacon;
pub mod bots;
pub mod config;
pub mod error;
pub mod game;
pub mod lobby;
pub mod network;
pub mod questions;
pub mod roster;
pub mod scores;
pub mod session;

#[cfg(test)]
mod testing;
