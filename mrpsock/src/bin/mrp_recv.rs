//! Demo peer: prints every payload it receives, forever.
//!
//! Usage: mrp_recv [local-addr]

use std::io::Write;
use std::net::SocketAddr;

use mrpsock::{Domain, MrpSocket, MAX_PAYLOAD_SIZE, SOCK_MRP};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let local: SocketAddr = args
        .next()
        .unwrap_or_else(|| "127.0.0.1:50017".into())
        .parse()?;

    let mut socket = MrpSocket::create(Domain::Ipv4, SOCK_MRP, 0)?;
    socket.bind(local).await?;

    let mut buf = [0u8; MAX_PAYLOAD_SIZE];
    loop {
        let (len, _src) = socket.recv_from(&mut buf).await?;
        print!("{}", String::from_utf8_lossy(&buf[..len]));
        std::io::stdout().flush()?;
    }
}
