use clap::Parser;
use log::{error, info, warn};
use server::beacon::{broadcast_target, Beacon};
use server::bots::InProcessBots;
use server::config::ServerConfig;
use server::lobby::LobbyManager;
use server::questions::geography;
use server::scores::{Leaderboard, MemoryScores, ScoreStore};
use server::session::SessionLoop;
use shared::Offer;
use std::net::Ipv4Addr;
use std::path::PathBuf;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// IP address to accept players on
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    host: String,

    /// TCP port for the lobby, 0 picks a free one
    #[arg(short, long, default_value = "0")]
    port: u16,

    /// Server name advertised to clients
    #[arg(short, long, default_value = "Lucky Bunnies")]
    name: String,

    /// Seats to fill with bots when fewer humans join
    #[arg(short, long, default_value = "4")]
    min_table_size: usize,

    /// Never add bots to fill the table
    #[arg(long)]
    no_bot_fill: bool,

    /// Extra bots seated in every game on top of the fill
    #[arg(short, long, default_value = "0")]
    bots: usize,

    /// Broadcast offers to this address instead of the local /24 network
    #[arg(long)]
    broadcast: Option<Ipv4Addr>,

    /// JSON file keeping all-time win counts
    #[arg(short, long, default_value = "winners.json")]
    leaderboard: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = ServerConfig {
        server_name: args.name,
        host: args.host,
        port: args.port,
        broadcast_addr: args.broadcast,
        min_table_size: args.min_table_size,
        fill_bots: !args.no_bot_fill,
        extra_bots: args.bots,
        leaderboard_path: args.leaderboard,
        ..ServerConfig::default()
    };

    let lobby = LobbyManager::bind(&config, InProcessBots).await?;
    let port = lobby.local_addr()?.port();

    let target = broadcast_target(&config).await;
    let beacon = Beacon::new(
        &Offer::new(config.server_name.clone(), port),
        target,
        config.beacon_interval,
    )?;
    let beacon_handle = tokio::spawn(async move {
        if let Err(e) = beacon.run().await {
            error!("Beacon stopped: {}", e);
        }
    });

    let result = match Leaderboard::open(&config.leaderboard_path) {
        Ok(board) => serve(lobby, board).await,
        Err(e) => {
            warn!(
                "Could not open {}: {}, keeping wins in memory",
                config.leaderboard_path.display(),
                e
            );
            serve(lobby, MemoryScores::default()).await
        }
    };

    beacon_handle.abort();
    info!("Shutting down the server... Goodbye!");
    result
}

/// Runs sessions until Ctrl+C
async fn serve<S: ScoreStore>(
    lobby: LobbyManager<InProcessBots>,
    scores: S,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut sessions = SessionLoop::new(lobby, scores, geography());

    tokio::select! {
        result = sessions.run() => {
            if let Err(e) = result {
                error!("Session loop failed: {}", e);
                return Err(e.into());
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    Ok(())
}
