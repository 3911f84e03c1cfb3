//! UDP offer broadcasts so clients can find the lobby
//!
//! Runs for the whole life of the server, games included.

use crate::config::ServerConfig;
use crate::error::ServerError;
use log::{debug, info, warn};
use shared::Offer;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::{interval, MissedTickBehavior};

/// Local IPv4 address of the interface used for outbound traffic. Connecting
/// a UDP socket only selects a route, nothing is sent.
pub async fn local_ipv4() -> Option<Ipv4Addr> {
    let socket = UdpSocket::bind("0.0.0.0:0").await.ok()?;
    socket.connect("8.8.8.8:80").await.ok()?;
    match socket.local_addr().ok()?.ip() {
        IpAddr::V4(ip) if !ip.is_unspecified() => Some(ip),
        _ => None,
    }
}

/// Broadcast address of the /24 network containing `ip`
pub fn subnet_broadcast(ip: Ipv4Addr) -> Ipv4Addr {
    let [a, b, c, _] = ip.octets();
    Ipv4Addr::new(a, b, c, 255)
}

/// Where offers are sent: the configured address, else the local /24
/// broadcast, else the limited broadcast address
pub async fn broadcast_target(config: &ServerConfig) -> SocketAddr {
    let ip = match config.broadcast_addr {
        Some(ip) => ip,
        None => local_ipv4()
            .await
            .map(subnet_broadcast)
            .unwrap_or(Ipv4Addr::BROADCAST),
    };
    SocketAddr::V4(SocketAddrV4::new(ip, config.discovery_port))
}

pub struct Beacon {
    offer: Vec<u8>,
    target: SocketAddr,
    interval: Duration,
}

impl Beacon {
    pub fn new(offer: &Offer, target: SocketAddr, interval: Duration) -> Result<Self, ServerError> {
        Ok(Self {
            offer: offer.encode()?,
            target,
            interval,
        })
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }

    /// Sends the offer every interval until the task is dropped. Send
    /// failures are logged and the next tick tries again.
    pub async fn run(self) -> Result<(), ServerError> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.set_broadcast(true)?;
        info!("Broadcasting offers to {}", self.target);

        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            match socket.send_to(&self.offer, self.target).await {
                Ok(_) => debug!("Offer sent to {}", self.target),
                Err(e) => warn!("Failed to send offer to {}: {}", self.target, e),
            }
        }
    }
}
