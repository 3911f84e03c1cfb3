//! TCP session with a trivia server, driven the same way for humans and bots

use log::debug;
use shared::{classify_line, ServerLine};
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Whoever decides the answers on this end of the connection
pub trait Player {
    fn name(&self) -> &str;

    /// Every line the server sends, questions included
    fn on_message(&mut self, line: &str);

    /// Produces the raw token to send back for a "True or False:" line
    fn answer(&mut self, question: &str) -> impl Future<Output = String> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The server announced the end of the game
    Finished,
    /// The connection closed without an end-of-game line
    ServerClosed,
}

pub struct Client {
    server_addr: SocketAddr,
    /// How long to keep reading standings after the end-of-game line
    trailing_timeout: Duration,
}

impl Client {
    pub fn new(server_addr: SocketAddr) -> Self {
        Self {
            server_addr,
            trailing_timeout: Duration::from_secs(2),
        }
    }

    pub fn server_addr(&self) -> SocketAddr {
        self.server_addr
    }

    /// Connects, registers the player's name and plays until the session ends
    pub async fn play<P: Player + Send>(&self, player: &mut P) -> io::Result<SessionEnd> {
        let stream = TcpStream::connect(self.server_addr).await?;
        debug!("{} connected to {}", player.name(), self.server_addr);
        self.play_on(stream, player).await
    }

    /// Runs the protocol over an already established connection
    pub async fn play_on<P: Player + Send>(
        &self,
        stream: TcpStream,
        player: &mut P,
    ) -> io::Result<SessionEnd> {
        let (reader, mut writer) = stream.into_split();
        writer.write_all(player.name().as_bytes()).await?;

        let mut lines = BufReader::new(reader).lines();
        while let Some(line) = lines.next_line().await? {
            match classify_line(&line) {
                ServerLine::Question(question) => {
                    player.on_message(question);
                    let answer = player.answer(question).await;
                    writer.write_all(format!("{}\n", answer).as_bytes()).await?;
                }
                ServerLine::SessionEnded(text) => {
                    player.on_message(text);
                    // Standings follow on the next lines until the server hangs up
                    while let Ok(Ok(Some(line))) =
                        timeout(self.trailing_timeout, lines.next_line()).await
                    {
                        player.on_message(&line);
                    }
                    return Ok(SessionEnd::Finished);
                }
                ServerLine::Info(text) => player.on_message(text),
            }
        }

        Ok(SessionEnd::ServerClosed)
    }
}
