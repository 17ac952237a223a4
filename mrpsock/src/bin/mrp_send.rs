//! Demo peer: sends a message to a printing peer one byte per MRP
//! message, waits for every byte to be acknowledged, and reports the
//! transmission count.
//!
//! Usage: mrp_send [local-addr] [peer-addr] [message]

use std::net::SocketAddr;
use std::time::Duration;

use mrpsock::{Domain, MrpSocket, SOCK_MRP};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let local: SocketAddr = args
        .next()
        .unwrap_or_else(|| "127.0.0.1:50016".into())
        .parse()?;
    let peer: SocketAddr = args
        .next()
        .unwrap_or_else(|| "127.0.0.1:50017".into())
        .parse()?;
    let message = args.next().unwrap_or_else(|| "hello over mrp\n".into());

    let mut socket = MrpSocket::create(Domain::Ipv4, SOCK_MRP, 0)?;
    socket.bind(local).await?;

    for byte in message.as_bytes() {
        socket.send_to(std::slice::from_ref(byte), peer).await?;
    }
    println!("sent {} messages to {peer}", message.len());

    while socket.unacked_len() > 0 {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    println!(
        "all acknowledged after {} transmissions",
        socket.total_transmissions()
    );

    socket.close().await?;
    Ok(())
}
