//! Listening for server offers on the discovery port

use log::debug;
use shared::Offer;
use std::io;
use std::net::SocketAddr;
use tokio::net::UdpSocket;

/// Binds the discovery port and waits for the first valid offer
pub async fn wait_for_offer(discovery_port: u16) -> io::Result<(SocketAddr, Offer)> {
    let socket = UdpSocket::bind(("0.0.0.0", discovery_port)).await?;
    receive_offer(&socket).await
}

/// Returns the TCP address of the first server whose offer decodes.
/// Datagrams with the wrong cookie or type are skipped.
pub async fn receive_offer(socket: &UdpSocket) -> io::Result<(SocketAddr, Offer)> {
    let mut buffer = [0u8; 1024];

    loop {
        let (len, from) = socket.recv_from(&mut buffer).await?;
        match Offer::decode(&buffer[..len]) {
            Ok(offer) => return Ok((SocketAddr::new(from.ip(), offer.tcp_port), offer)),
            Err(e) => debug!("Ignoring datagram from {}: {}", from, e),
        }
    }
}
