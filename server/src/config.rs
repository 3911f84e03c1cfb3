//! Server tunables and their defaults

use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::time::Duration;

/// Cosmetic pauses that give human players time to read
#[derive(Debug, Clone)]
pub struct Pacing {
    /// After the lobby closes and after bots are seated
    pub lobby_settle: Duration,
    /// Between the round announcement and the question
    pub round_intro: Duration,
    /// Before the results listing of a round
    pub results: Duration,
    /// After a round has been adjudicated
    pub between_rounds: Duration,
}

impl Pacing {
    pub fn none() -> Self {
        Self {
            lobby_settle: Duration::ZERO,
            round_intro: Duration::ZERO,
            results: Duration::ZERO,
            between_rounds: Duration::ZERO,
        }
    }
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            lobby_settle: Duration::from_secs(1),
            round_intro: Duration::from_secs(5),
            results: Duration::from_secs(2),
            between_rounds: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Name advertised in the discovery offer
    pub server_name: String,
    pub host: String,
    /// 0 lets the OS pick; the beacon advertises whatever was bound
    pub port: u16,
    pub discovery_port: u16,
    /// Overrides the computed /24 broadcast address
    pub broadcast_addr: Option<Ipv4Addr>,
    pub beacon_interval: Duration,
    /// Delay before retrying a failed bind; `None` attempts means forever
    pub bind_retry_delay: Duration,
    pub bind_attempts: Option<u32>,

    /// Silence after the last accepted connection that closes the lobby
    pub lobby_idle_timeout: Duration,
    /// Time a new connection has to send its display name
    pub registration_timeout: Duration,
    pub bot_join_timeout: Duration,
    pub min_table_size: usize,
    pub fill_bots: bool,
    /// Bots added on top of the fill
    pub extra_bots: usize,

    pub answer_deadline: Duration,
    pub write_timeout: Duration,
    /// How long a liveness probe waits for the peer's socket to report EOF
    pub probe_window: Duration,

    pub leaderboard_path: PathBuf,
    pub leaderboard_size: usize,
    pub pacing: Pacing,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server_name: "Lucky Bunnies".to_string(),
            host: "0.0.0.0".to_string(),
            port: 0,
            discovery_port: shared::DISCOVERY_PORT,
            broadcast_addr: None,
            beacon_interval: Duration::from_secs(1),
            bind_retry_delay: Duration::from_millis(500),
            bind_attempts: None,
            lobby_idle_timeout: Duration::from_secs(10),
            registration_timeout: Duration::from_secs(10),
            bot_join_timeout: Duration::from_secs(10),
            min_table_size: 4,
            fill_bots: true,
            extra_bots: 0,
            answer_deadline: Duration::from_secs(15),
            write_timeout: Duration::from_secs(5),
            probe_window: Duration::from_millis(50),
            leaderboard_path: PathBuf::from("winners.json"),
            leaderboard_size: 3,
            pacing: Pacing::default(),
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timings() {
        let config = ServerConfig::default();

        assert_eq!(config.lobby_idle_timeout, Duration::from_secs(10));
        assert_eq!(config.answer_deadline, Duration::from_secs(15));
        assert_eq!(config.min_table_size, 4);
        assert!(config.fill_bots);
        assert_eq!(config.discovery_port, 13117);
        assert_eq!(config.bind_addr(), "0.0.0.0:0");
    }

    #[test]
    fn test_pacing_none_is_zero() {
        let pacing = Pacing::none();

        assert!(pacing.lobby_settle.is_zero());
        assert!(pacing.round_intro.is_zero());
        assert!(pacing.results.is_zero());
        assert!(pacing.between_rounds.is_zero());
    }
}
