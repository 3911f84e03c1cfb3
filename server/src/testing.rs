//! Loopback socket helpers for unit tests

use crate::roster::{Participant, Status};
use tokio::net::{TcpListener, TcpStream};

/// Returns (server side, peer side) of a fresh loopback connection
pub async fn connected_pair() -> (TcpStream, TcpStream) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let (peer, accepted) = tokio::join!(TcpStream::connect(addr), listener.accept());
    (accepted.unwrap().0, peer.unwrap())
}

/// A participant with the given name, plus the peer end of its connection
pub async fn participant(id: u32, name: &str) -> (Participant, TcpStream) {
    let (server_side, peer) = connected_pair().await;
    let addr = peer.local_addr().unwrap();

    let mut participant = Participant::new(id, server_side, addr);
    if !name.is_empty() {
        participant.name = name.to_string();
        participant.status = Status::Active;
    }
    (participant, peer)
}
