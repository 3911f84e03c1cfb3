//! # Trivia Client Library
//!
//! Client side of the LAN trivia game. A client finds a server by listening
//! for its UDP offer, connects over TCP, sends its display name and then
//! reacts to the server's free-text lines until the game ends.
//!
//! ## Module Organization
//!
//! ### Discovery Module (`discovery`)
//! Binds the well-known discovery port and decodes offer datagrams, skipping
//! anything whose cookie or message type does not match.
//!
//! ### Network Module (`network`)
//! The TCP session itself. The protocol loop is written once against the
//! [`network::Player`] trait, so humans and bots only differ in how they
//! pick an answer.
//!
//! ### Input Module (`input`)
//! Console player: prints every server line and reads answers from stdin
//! with a local deadline, falling back to the `NONE` token.
//!
//! ### Bot Module (`bot`)
//! Automated player answering uniformly at random. The server seats these
//! when a table is short of humans.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::bot::Bot;
//! use client::network::Client;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (server_addr, offer) = client::discovery::wait_for_offer(shared::DISCOVERY_PORT).await?;
//!     println!("Joining {}", offer.server_name);
//!
//!     let mut bot = Bot::new("BOT_cook");
//!     Client::new(server_addr).play(&mut bot).await?;
//!     Ok(())
//! }
//! ```

pub mod bot;
pub mod discovery;
pub mod input;
pub mod network;
