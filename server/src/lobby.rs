//! Lobby: accepting players, registering names and filling empty seats
//!
//! The listening socket is owned by the [`LobbyManager`] for the lifetime of
//! the server and is only accepted on while a lobby is open. Connections
//! that arrive while a game is running wait in the listen backlog and are
//! registered by the next lobby.
//!
//! Bots are seated one at a time, each accept waiting at most
//! `bot_join_timeout`. A bot that misses its timeout is stopped, and so is
//! one whose seat was taken by a human queued ahead of it, so no stray bot
//! connection is left for the next lobby to register as a player.
//!
//! The joining window stays open until nobody new has connected for
//! `lobby_idle_timeout`; each accepted connection restarts that timer.
//! Before the first connection arrives the lobby waits indefinitely.

use crate::bots::BotSpawner;
use crate::config::ServerConfig;
use crate::error::{RegistrationError, ServerError};
use crate::network::{send_text, send_to_all};
use crate::roster::{Participant, ParticipantId};
use crate::session::Session;
use client::bot::pick_bot_name;
use log::{debug, info, warn};
use shared::{LOBBY_WAIT_MESSAGE, MAX_MESSAGE_LEN};
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tokio::time::{sleep, sleep_until, timeout, Instant};

type Registration = (ParticipantId, Result<Participant, RegistrationError>);

/// Binds `addr`, retrying after `retry_delay` on failure. `None` attempts
/// keeps retrying forever.
pub async fn bind_with_retry(
    addr: &str,
    retry_delay: Duration,
    attempts: Option<u32>,
) -> Result<TcpListener, ServerError> {
    let mut attempt = 0;

    loop {
        attempt += 1;
        match TcpListener::bind(addr).await {
            Ok(listener) => {
                info!("Server started, listening on {}", listener.local_addr()?);
                return Ok(listener);
            }
            Err(e) if attempts.map_or(false, |max| attempt >= max) => {
                return Err(ServerError::Bind {
                    addr: addr.to_string(),
                    attempts: attempt,
                    source: e,
                });
            }
            Err(e) => {
                warn!("Failed to bind {} (attempt {}): {}", addr, attempt, e);
                sleep(retry_delay).await;
            }
        }
    }
}

/// Reads the display name a new connection opens with and answers with the
/// waiting message. An empty name falls back to "Player <id>".
pub async fn register(
    mut participant: Participant,
    registration_timeout: Duration,
    write_timeout: Duration,
) -> Result<Participant, RegistrationError> {
    let mut buffer = [0u8; MAX_MESSAGE_LEN];

    let read = timeout(registration_timeout, participant.stream_mut().read(&mut buffer)).await;
    let n = match read {
        Ok(result) => result?,
        Err(_) => return Err(RegistrationError::TimedOut(registration_timeout)),
    };
    if n == 0 {
        return Err(RegistrationError::Closed);
    }

    let name = String::from_utf8_lossy(&buffer[..n]).trim().to_string();
    participant.name = if name.is_empty() {
        format!("Player {}", participant.id)
    } else {
        name
    };

    send_text(participant.stream_mut(), LOBBY_WAIT_MESSAGE, write_timeout).await?;
    Ok(participant)
}

async fn idle_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

pub struct LobbyManager<B> {
    listener: TcpListener,
    config: ServerConfig,
    spawner: B,
}

impl<B: BotSpawner> LobbyManager<B> {
    /// Binds the configured address, retrying per the config
    pub async fn bind(config: &ServerConfig, spawner: B) -> Result<Self, ServerError> {
        let listener = bind_with_retry(
            &config.bind_addr(),
            config.bind_retry_delay,
            config.bind_attempts,
        )
        .await?;

        Ok(Self::from_listener(listener, config.clone(), spawner))
    }

    pub fn from_listener(listener: TcpListener, config: ServerConfig, spawner: B) -> Self {
        Self {
            listener,
            config,
            spawner,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Address a bot on this machine should connect to
    pub fn loopback_addr(&self) -> io::Result<SocketAddr> {
        let addr = self.listener.local_addr()?;
        let ip = match addr.ip() {
            IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
            IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
            ip => ip,
        };
        Ok(SocketAddr::new(ip, addr.port()))
    }

    /// Fills `session.roster` with players for one game.
    ///
    /// Runs the joining window, drops anyone who left before it closed, then
    /// seats bots one at a time until there are `min_table_size` players (plus
    /// any configured extra bots). Leaves the roster empty if nobody joined.
    pub async fn form_roster(
        &self,
        session: &mut Session,
        min_table_size: usize,
    ) -> Result<(), ServerError> {
        self.accept_window(session).await;
        sleep(self.config.pacing.lobby_settle).await;
        session.drop_unreachable(self.config.probe_window).await;

        if session.roster.is_empty() {
            return Ok(());
        }

        let humans = session.roster.len();
        let fill = if self.config.fill_bots {
            min_table_size.saturating_sub(humans)
        } else {
            0
        };
        let bots = fill + self.config.extra_bots;
        info!("Lobby closed with {} players, seating {} bots", humans, bots);

        if bots > 0 {
            if fill > 0 {
                send_to_all(
                    session.roster.iter_mut(),
                    "Not enough players. Adding bots to the game.\n",
                    self.config.write_timeout,
                )
                .await;
            }

            let mut started = Vec::with_capacity(bots);
            for _ in 0..bots {
                started.push(self.seat_bot(session).await?);
            }

            let seated = session.roster.names();
            for (name, handle) in started {
                if seated.contains(&name.as_str()) {
                    continue;
                }
                if let Some(handle) = handle {
                    debug!("Stopping {}, its seat went to someone else", name);
                    handle.abort();
                }
            }

            sleep(self.config.pacing.lobby_settle).await;
            session.drop_unreachable(self.config.probe_window).await;
        }

        Ok(())
    }

    async fn accept_window(&self, session: &mut Session) {
        let (tx, mut rx) = mpsc::unbounded_channel::<Registration>();
        let mut pending = 0usize;
        let mut deadline: Option<Instant> = None;

        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    let (stream, addr) = match accepted {
                        Ok(pair) => pair,
                        Err(e) => {
                            warn!("Failed to accept connection: {}", e);
                            continue;
                        }
                    };

                    let id = session.allocate_id();
                    debug!("Connection {} accepted from {}", id, addr);
                    pending += 1;
                    deadline = Some(Instant::now() + self.config.lobby_idle_timeout);

                    let tx = tx.clone();
                    let registration_timeout = self.config.registration_timeout;
                    let write_timeout = self.config.write_timeout;
                    tokio::spawn(async move {
                        let participant = Participant::new(id, stream, addr);
                        let result = register(participant, registration_timeout, write_timeout).await;
                        let _ = tx.send((id, result));
                    });
                }
                Some((id, result)) = rx.recv() => {
                    pending -= 1;
                    self.admit(session, id, result).await;
                }
                _ = idle_until(deadline) => break,
            }
        }

        // Connections accepted just before the window closed still get seated
        while pending > 0 {
            match rx.recv().await {
                Some((id, result)) => {
                    pending -= 1;
                    self.admit(session, id, result).await;
                }
                None => break,
            }
        }
    }

    async fn admit(
        &self,
        session: &mut Session,
        id: ParticipantId,
        result: Result<Participant, RegistrationError>,
    ) {
        match result {
            Ok(participant) => {
                info!("{} joined the lobby from {}", participant.name, participant.addr);
                let notice = format!("Player {} joined the lobby.\n", participant.name);
                send_to_all(session.roster.iter_mut(), &notice, self.config.write_timeout).await;
                session.roster.insert(participant);
            }
            Err(e) => {
                warn!("Connection {} never joined: {}", id, e);
                session.mark_never_joined(id);
            }
        }
    }

    /// Starts one bot and waits for it to register before returning. Hands
    /// back the bot's name and handle so the caller can stop it if someone
    /// else ended up in the seat.
    async fn seat_bot(
        &self,
        session: &mut Session,
    ) -> Result<(String, Option<AbortHandle>), ServerError> {
        let name = pick_bot_name(&session.roster.names());
        let handle = self.spawner.spawn(name.clone(), self.loopback_addr()?);

        let (stream, addr) = match timeout(self.config.bot_join_timeout, self.listener.accept()).await {
            Ok(Ok(pair)) => pair,
            Ok(Err(e)) => {
                warn!("Failed to accept {}: {}", name, e);
                return Ok((name, handle));
            }
            Err(_) => {
                warn!("{} did not connect within {:?}", name, self.config.bot_join_timeout);
                if let Some(handle) = handle {
                    handle.abort();
                }
                return Ok((name, None));
            }
        };

        let id = session.allocate_id();
        let participant = Participant::new(id, stream, addr);
        let result = register(
            participant,
            self.config.registration_timeout,
            self.config.write_timeout,
        )
        .await;
        self.admit(session, id, result).await;
        Ok((name, handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bots::NoBots;
    use crate::config::Pacing;
    use crate::questions::geography;
    use crate::testing::connected_pair;
    use std::sync::{Arc, Mutex};
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpStream;

    fn test_config() -> ServerConfig {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            lobby_idle_timeout: Duration::from_millis(200),
            registration_timeout: Duration::from_millis(500),
            bot_join_timeout: Duration::from_millis(500),
            pacing: Pacing::none(),
            ..ServerConfig::default()
        }
    }

    /// Connects a plain socket for every requested bot and remembers the name
    #[derive(Clone, Default)]
    struct RecordingBots {
        names: Arc<Mutex<Vec<String>>>,
    }

    impl BotSpawner for RecordingBots {
        fn spawn(&self, name: String, server_addr: SocketAddr) -> Option<AbortHandle> {
            self.names.lock().unwrap().push(name.clone());
            let handle = tokio::spawn(async move {
                let mut stream = TcpStream::connect(server_addr).await.unwrap();
                stream.write_all(name.as_bytes()).await.unwrap();
                let mut buf = [0u8; 1024];
                while let Ok(n) = stream.read(&mut buf).await {
                    if n == 0 {
                        break;
                    }
                }
            });
            Some(handle.abort_handle())
        }
    }

    /// Bots that take `delay` to dial in, longer than the lobby waits
    #[derive(Clone)]
    struct LateBots {
        delay: Duration,
    }

    impl BotSpawner for LateBots {
        fn spawn(&self, name: String, server_addr: SocketAddr) -> Option<AbortHandle> {
            let delay = self.delay;
            let handle = tokio::spawn(async move {
                sleep(delay).await;
                if let Ok(mut stream) = TcpStream::connect(server_addr).await {
                    let _ = stream.write_all(name.as_bytes()).await;
                    let mut buf = [0u8; 1024];
                    while let Ok(n) = stream.read(&mut buf).await {
                        if n == 0 {
                            break;
                        }
                    }
                }
            });
            Some(handle.abort_handle())
        }
    }

    async fn join(addr: SocketAddr, name: &str) -> TcpStream {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(name.as_bytes()).await.unwrap();
        stream
    }

    #[tokio::test]
    async fn test_register_reads_name_and_replies() {
        let (server_side, mut peer) = connected_pair().await;
        let addr = peer.local_addr().unwrap();
        peer.write_all(b"ruby\n").await.unwrap();

        let participant = register(
            Participant::new(1, server_side, addr),
            Duration::from_millis(200),
            Duration::from_millis(200),
        )
        .await
        .unwrap();

        assert_eq!(participant.name, "ruby");
        let mut buf = [0u8; 64];
        let n = peer.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], LOBBY_WAIT_MESSAGE.as_bytes());
    }

    #[tokio::test]
    async fn test_register_closed_peer() {
        let (server_side, peer) = connected_pair().await;
        let addr = peer.local_addr().unwrap();
        drop(peer);

        let result = register(
            Participant::new(1, server_side, addr),
            Duration::from_millis(200),
            Duration::from_millis(200),
        )
        .await;

        assert!(matches!(result, Err(RegistrationError::Closed)));
    }

    #[tokio::test]
    async fn test_register_silent_peer_times_out() {
        let (server_side, peer) = connected_pair().await;
        let addr = peer.local_addr().unwrap();

        let result = register(
            Participant::new(1, server_side, addr),
            Duration::from_millis(50),
            Duration::from_millis(50),
        )
        .await;

        assert!(matches!(result, Err(RegistrationError::TimedOut(_))));
    }

    #[tokio::test]
    async fn test_bind_with_retry_gives_up() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = taken.local_addr().unwrap().to_string();

        let result = bind_with_retry(&addr, Duration::from_millis(10), Some(2)).await;

        assert!(matches!(result, Err(ServerError::Bind { attempts: 2, .. })));
    }

    #[tokio::test]
    async fn test_one_human_gets_three_bots() {
        let bots = RecordingBots::default();
        let lobby = LobbyManager::bind(&test_config(), bots.clone()).await.unwrap();
        let addr = lobby.loopback_addr().unwrap();
        let mut session = Session::new(1, geography());

        let _human = join(addr, "ruby").await;
        lobby.form_roster(&mut session, 4).await.unwrap();

        assert_eq!(session.roster.len(), 4);
        assert_eq!(bots.names.lock().unwrap().len(), 3);
        assert_eq!(session.roster.names()[0], "ruby");
        assert!(session.roster.names()[1..]
            .iter()
            .all(|name| name.starts_with("BOT_")));
    }

    #[tokio::test]
    async fn test_bot_that_never_connects_is_skipped() {
        let config = ServerConfig {
            bot_join_timeout: Duration::from_millis(100),
            ..test_config()
        };
        let lobby = LobbyManager::bind(&config, NoBots).await.unwrap();
        let addr = lobby.loopback_addr().unwrap();
        let mut session = Session::new(1, geography());

        let _human = join(addr, "ruby").await;
        let started = std::time::Instant::now();
        lobby.form_roster(&mut session, 3).await.unwrap();

        assert_eq!(session.roster.names(), vec!["ruby"]);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_late_bot_is_stopped_before_it_connects() {
        let config = ServerConfig {
            bot_join_timeout: Duration::from_millis(100),
            ..test_config()
        };
        let bots = LateBots {
            delay: Duration::from_millis(300),
        };
        let lobby = LobbyManager::bind(&config, bots).await.unwrap();
        let addr = lobby.loopback_addr().unwrap();
        let mut session = Session::new(1, geography());

        let _human = join(addr, "ruby").await;
        lobby.form_roster(&mut session, 2).await.unwrap();
        assert_eq!(session.roster.len(), 1);

        // Past the moment the bot would have dialed in
        sleep(Duration::from_millis(400)).await;
        let stray = timeout(Duration::from_millis(100), lobby.listener.accept()).await;
        assert!(stray.is_err());
    }

    #[tokio::test]
    async fn test_no_fill_when_disabled() {
        let config = ServerConfig {
            fill_bots: false,
            ..test_config()
        };
        let lobby = LobbyManager::bind(&config, NoBots).await.unwrap();
        let addr = lobby.loopback_addr().unwrap();
        let mut session = Session::new(1, geography());

        let _a = join(addr, "a").await;
        let _b = join(addr, "b").await;
        lobby.form_roster(&mut session, 4).await.unwrap();

        assert_eq!(session.roster.len(), 2);
    }

    #[tokio::test]
    async fn test_failed_registration_never_joins() {
        let config = ServerConfig {
            fill_bots: false,
            ..test_config()
        };
        let lobby = LobbyManager::bind(&config, NoBots).await.unwrap();
        let addr = lobby.loopback_addr().unwrap();
        let mut session = Session::new(1, geography());

        let _a = join(addr, "a").await;
        drop(TcpStream::connect(addr).await.unwrap());
        lobby.form_roster(&mut session, 4).await.unwrap();

        assert_eq!(session.roster.names(), vec!["a"]);
        assert_eq!(session.never_joined(), &[2]);
    }

    #[tokio::test]
    async fn test_existing_players_hear_about_joins() {
        let config = ServerConfig {
            fill_bots: false,
            ..test_config()
        };
        let lobby = LobbyManager::bind(&config, NoBots).await.unwrap();
        let addr = lobby.loopback_addr().unwrap();
        let mut session = Session::new(1, geography());

        let mut first = join(addr, "first").await;
        let forming = async {
            lobby.form_roster(&mut session, 2).await.unwrap();
        };
        let second = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            join(addr, "second").await
        };
        let (_, _second) = tokio::join!(forming, second);

        let mut received = Vec::new();
        let mut buf = [0u8; 256];
        while !String::from_utf8_lossy(&received).contains("second joined") {
            let n = first.read(&mut buf).await.unwrap();
            assert!(n > 0);
            received.extend_from_slice(&buf[..n]);
        }
        let text = String::from_utf8_lossy(&received);
        assert!(text.starts_with(LOBBY_WAIT_MESSAGE));
        assert!(text.contains("Player second joined the lobby.\n"));
    }

    #[tokio::test]
    async fn test_idle_timer_resets_on_each_join() {
        let config = ServerConfig {
            fill_bots: false,
            lobby_idle_timeout: Duration::from_millis(150),
            ..test_config()
        };
        let lobby = LobbyManager::bind(&config, NoBots).await.unwrap();
        let addr = lobby.loopback_addr().unwrap();
        let mut session = Session::new(1, geography());

        let joiners = async {
            let mut streams = Vec::new();
            for name in ["a", "b", "c"] {
                streams.push(join(addr, name).await);
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
            streams
        };
        let (result, _streams) = tokio::join!(lobby.form_roster(&mut session, 3), joiners);
        result.unwrap();

        // Total spread is 200ms, longer than the idle timeout
        assert_eq!(session.roster.len(), 3);
    }
}
