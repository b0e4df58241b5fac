//! Datagram transport abstraction.
//!
//! The protocol core needs only two primitives from the network:
//! `send(packet, destination)` and `receive(timeout) -> packet`.  They are
//! captured by the [`Transport`] trait so the sessions can run over a real
//! [`Socket`] or over the fault-injecting [`crate::simulator::Simulator`].
//!
//! [`Socket`] is a thin wrapper around `tokio::net::UdpSocket` that speaks
//! [`Packet`] instead of raw bytes.  All protocol logic lives elsewhere; this
//! module owns only byte I/O.

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use tokio::net::UdpSocket;

use crate::packet::{Packet, PacketError, PACKET_LEN};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that can arise from transport operations.
#[derive(Debug, Error)]
pub enum SocketError {
    /// Underlying I/O error from the OS.
    #[error("socket I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The received datagram has the wrong size to be a packet.
    #[error("packet decode error: {0}")]
    Packet(#[from] PacketError),
    /// Nothing arrived within the wait window.
    #[error("timed out waiting for a datagram")]
    Timeout,
}

impl SocketError {
    /// `true` if a retry may succeed: timeouts, undecodable datagrams and
    /// ICMP-induced errors that some platforms surface on `recv`.
    pub fn is_transient(&self) -> bool {
        use std::io::ErrorKind;
        match self {
            Self::Timeout | Self::Packet(_) => true,
            Self::Io(e) => matches!(
                e.kind(),
                ErrorKind::TimedOut
                    | ErrorKind::WouldBlock
                    | ErrorKind::Interrupted
                    | ErrorKind::ConnectionRefused
                    | ErrorKind::ConnectionReset
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// An unreliable, packet-oriented datagram endpoint.
///
/// Implementations deliver or lose whole packets; they never split or merge
/// them.  Everything else (loss, corruption, reordering, duplication) is
/// fair game.
pub trait Transport {
    /// Send one packet to `dest`.
    fn send_to(
        &self,
        packet: &Packet,
        dest: SocketAddr,
    ) -> impl Future<Output = Result<(), SocketError>> + Send;

    /// Receive the next packet.
    ///
    /// `wait = None` blocks indefinitely; otherwise [`SocketError::Timeout`]
    /// is returned when nothing arrives in time.
    fn recv_from(
        &self,
        wait: Option<Duration>,
    ) -> impl Future<Output = Result<(Packet, SocketAddr), SocketError>> + Send;
}

// ---------------------------------------------------------------------------
// Socket
// ---------------------------------------------------------------------------

/// An async UDP socket carrying fixed-size [`Packet`]s.
///
/// All methods are `&self` so the socket can be shared across tasks if needed.
#[derive(Debug)]
pub struct Socket {
    /// Address this socket is bound to (filled in after OS assigns ephemeral port).
    pub local_addr: SocketAddr,
    inner: UdpSocket,
}

impl Socket {
    /// Bind a new socket to `local_addr`.
    ///
    /// Passing `0.0.0.0:0` lets the OS choose an ephemeral port.
    pub async fn bind(local_addr: SocketAddr) -> Result<Self, SocketError> {
        let inner = UdpSocket::bind(local_addr).await?;
        let local_addr = inner.local_addr()?;
        Ok(Self { local_addr, inner })
    }
}

impl Transport for Socket {
    async fn send_to(&self, packet: &Packet, dest: SocketAddr) -> Result<(), SocketError> {
        self.inner.send_to(packet.as_bytes(), dest).await?;
        Ok(())
    }

    async fn recv_from(
        &self,
        wait: Option<Duration>,
    ) -> Result<(Packet, SocketAddr), SocketError> {
        // One spare byte so oversized datagrams are noticed instead of truncated.
        let mut buf = [0u8; PACKET_LEN + 1];
        let (n, addr) = match wait {
            Some(wait) => tokio::time::timeout(wait, self.inner.recv_from(&mut buf))
                .await
                .map_err(|_| SocketError::Timeout)??,
            None => self.inner.recv_from(&mut buf).await?,
        };
        let packet = Packet::from_bytes(&buf[..n])?;
        Ok((packet, addr))
    }
}
