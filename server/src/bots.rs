//! Launching automated players for empty seats

use log::{debug, warn};
use std::net::SocketAddr;
use tokio::task::AbortHandle;

/// Starts a bot that connects back to the lobby at `server_addr` and
/// registers under `name`. Must return without waiting for the bot to join.
///
/// The returned handle lets the lobby stop a bot it no longer has a seat
/// for; spawners that start nothing return `None`.
pub trait BotSpawner: Send + Sync {
    fn spawn(&self, name: String, server_addr: SocketAddr) -> Option<AbortHandle>;
}

/// Runs each bot as a task inside the server process
#[derive(Debug, Default, Clone, Copy)]
pub struct InProcessBots;

impl BotSpawner for InProcessBots {
    fn spawn(&self, name: String, server_addr: SocketAddr) -> Option<AbortHandle> {
        let handle = tokio::spawn(async move {
            debug!("Starting bot {} against {}", name, server_addr);
            if let Err(e) = client::bot::run_bot(name.clone(), server_addr).await {
                warn!("Bot {} stopped: {}", name, e);
            }
        });
        Some(handle.abort_handle())
    }
}

/// Spawns nothing; the lobby will time out waiting for the seat
#[derive(Debug, Default, Clone, Copy)]
pub struct NoBots;

impl BotSpawner for NoBots {
    fn spawn(&self, name: String, _server_addr: SocketAddr) -> Option<AbortHandle> {
        debug!("Bot {} not started, bot spawning disabled", name);
        None
    }
}
