use clap::Parser;
use client::bot::Bot;
use client::discovery::wait_for_offer;
use client::input::{spawn_stdin_reader, ConsolePlayer};
use client::network::{Client, Player, SessionEnd};
use log::{info, warn};
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Display name sent to the server
    #[arg(short = 'n', long, default_value = "ruby")]
    name: String,

    /// Answer automatically instead of reading from the console
    #[arg(long)]
    bot: bool,

    /// Connect to this server directly instead of waiting for an offer
    #[arg(short = 's', long)]
    server: Option<SocketAddr>,

    /// UDP port the server beacon broadcasts on
    #[arg(short = 'd', long, default_value_t = shared::DISCOVERY_PORT)]
    discovery_port: u16,

    /// Seconds to answer a question before giving up
    #[arg(short = 't', long, default_value = "10")]
    answer_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let result = if args.bot {
        let mut bot = Bot::new(args.name.clone());
        tokio::select! {
            result = play_forever(&mut bot, args.server, args.discovery_port) => result,
            _ = tokio::signal::ctrl_c() => Ok(()),
        }
    } else {
        let lines = spawn_stdin_reader();
        let mut player = ConsolePlayer::new(
            args.name.clone(),
            Duration::from_secs(args.answer_timeout),
            lines,
        );
        tokio::select! {
            result = play_forever(&mut player, args.server, args.discovery_port) => result,
            _ = tokio::signal::ctrl_c() => Ok(()),
        }
    };

    println!("Shutting down client.... Goodbye!");
    result
}

/// Discovers a server, plays a session and goes back to discovery
async fn play_forever<P: Player + Send>(
    player: &mut P,
    server: Option<SocketAddr>,
    discovery_port: u16,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("Client started, listening for offer requests...");

    loop {
        let server_addr = match server {
            Some(addr) => addr,
            None => {
                let (addr, offer) = wait_for_offer(discovery_port).await?;
                println!(
                    "Received offer from server '{}' at address {}, attempting to connect...",
                    offer.server_name,
                    addr.ip()
                );
                addr
            }
        };

        match Client::new(server_addr).play(player).await {
            Ok(SessionEnd::Finished) => {
                info!("Session with {} finished", server_addr);
                println!("Game finished, listening for offer requests...\n");
            }
            Ok(SessionEnd::ServerClosed) => {
                println!("Server disconnected, listening for offer requests...\n");
            }
            Err(e) if e.kind() == ErrorKind::ConnectionRefused => {
                println!("Game currently in progress. Trying again in 10 seconds....\n");
                tokio::time::sleep(Duration::from_secs(10)).await;
            }
            Err(e) => {
                warn!("Connection to {} failed: {}", server_addr, e);
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        }
    }
}
