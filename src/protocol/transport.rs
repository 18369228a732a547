//! # Transport contract
//!
//! The only thing an adapter needs from the network: send a packet, receive
//! the next one, close. Packet framing is the transport's business; the text
//! protocol puts one or more lines in each packet.
//!
//! | Transport | Description |
//! |-----------|-------------|
//! | `ChannelTransport` | In-process pair over tokio channels, for tests and embedding |
//! | `UdpTransport` | One connected UDP socket, one datagram per packet |

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;

use crate::{Error, Result};

/// Largest datagram `UdpTransport` will read.
pub const MAX_DATAGRAM: usize = 65_507;

#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one packet.
    async fn send(&self, packet: Bytes) -> Result<()>;

    /// Next inbound packet, or `None` once the peer is gone or the
    /// transport was closed.
    async fn recv(&self) -> Result<Option<Bytes>>;

    /// Stop sending. Further `send` calls fail.
    async fn close(&self) -> Result<()>;
}

// ============================================================================
// In-process channel pair
// ============================================================================

pub struct ChannelTransport {
    tx: parking_lot::Mutex<Option<mpsc::UnboundedSender<Bytes>>>,
    rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<Bytes>>,
}

impl ChannelTransport {
    /// Two connected ends: what one sends the other receives.
    pub fn pair() -> (Self, Self) {
        let (a_tx, a_rx) = mpsc::unbounded_channel();
        let (b_tx, b_rx) = mpsc::unbounded_channel();
        let a = Self { tx: parking_lot::Mutex::new(Some(a_tx)), rx: tokio::sync::Mutex::new(b_rx) };
        let b = Self { tx: parking_lot::Mutex::new(Some(b_tx)), rx: tokio::sync::Mutex::new(a_rx) };
        (a, b)
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn send(&self, packet: Bytes) -> Result<()> {
        let tx = self.tx.lock().clone().ok_or_else(|| Error::Protocol("transport closed".into()))?;
        tx.send(packet).map_err(|_| Error::Protocol("peer disconnected".into()))
    }

    async fn recv(&self) -> Result<Option<Bytes>> {
        Ok(self.rx.lock().await.recv().await)
    }

    async fn close(&self) -> Result<()> {
        self.tx.lock().take();
        Ok(())
    }
}

// ============================================================================
// UDP
// ============================================================================

pub struct UdpTransport {
    socket: UdpSocket,
    closed: AtomicBool,
}

impl UdpTransport {
    /// Bind `local` and connect to `peer`; only datagrams from `peer` are
    /// received.
    pub async fn bind(local: SocketAddr, peer: SocketAddr) -> Result<Self> {
        let socket = UdpSocket::bind(local).await?;
        socket.connect(peer).await?;
        Ok(Self { socket, closed: AtomicBool::new(false) })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }
}

#[async_trait]
impl Transport for UdpTransport {
    async fn send(&self, packet: Bytes) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::Protocol("transport closed".into()));
        }
        self.socket.send(&packet).await?;
        Ok(())
    }

    async fn recv(&self) -> Result<Option<Bytes>> {
        let mut buf = vec![0u8; MAX_DATAGRAM];
        loop {
            if self.closed.load(Ordering::Acquire) {
                return Ok(None);
            }
            match self.socket.recv(&mut buf).await {
                Ok(n) => return Ok(Some(Bytes::copy_from_slice(&buf[..n]))),
                // ICMP port unreachable from an earlier send; the peer may
                // not be up yet.
                Err(e) if e.kind() == std::io::ErrorKind::ConnectionRefused => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_pair_delivers_both_ways() {
        let (a, b) = ChannelTransport::pair();
        a.send(Bytes::from_static(b"/x 1")).await.unwrap();
        b.send(Bytes::from_static(b"/y 2")).await.unwrap();
        assert_eq!(b.recv().await.unwrap().unwrap(), Bytes::from_static(b"/x 1"));
        assert_eq!(a.recv().await.unwrap().unwrap(), Bytes::from_static(b"/y 2"));
    }

    #[tokio::test]
    async fn test_close_ends_peer_stream() {
        let (a, b) = ChannelTransport::pair();
        a.close().await.unwrap();
        assert!(b.recv().await.unwrap().is_none());
        assert!(matches!(a.send(Bytes::new()).await, Err(Error::Protocol(_))));
    }

    #[tokio::test]
    async fn test_udp_loopback() {
        let any: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let first = UdpSocket::bind(any).await.unwrap();
        let a_addr = first.local_addr().unwrap();
        drop(first);
        let b_sock = UdpSocket::bind(any).await.unwrap();
        let b_addr = b_sock.local_addr().unwrap();
        drop(b_sock);

        let a = UdpTransport::bind(a_addr, b_addr).await.unwrap();
        let b = UdpTransport::bind(b_addr, a_addr).await.unwrap();
        a.send(Bytes::from_static(b"?get /x")).await.unwrap();
        assert_eq!(b.recv().await.unwrap().unwrap(), Bytes::from_static(b"?get /x"));
    }
}
