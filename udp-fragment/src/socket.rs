//! Async UDP socket abstraction.
//!
//! [`Socket`] is a thin wrapper around `tokio::net::UdpSocket` that speaks
//! [`crate::packet::Datagram`] instead of raw bytes.  All protocol logic
//! lives elsewhere; this module owns only byte I/O.

use std::net::SocketAddr;

use thiserror::Error;
use tokio::net::UdpSocket;

use crate::packet::{Datagram, PacketError};

/// Maximum UDP payload size accepted on receive.
const MAX_DATAGRAM: usize = 65_535;

/// Errors that can arise from socket operations.
#[derive(Error, Debug)]
pub enum SocketError {
    /// Underlying I/O error from the OS.
    #[error("socket I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// A datagram arrived from `from` but could not be decoded.
    #[error("malformed datagram from {from}: {source}")]
    Packet {
        from: SocketAddr,
        #[source]
        source: PacketError,
    },
}

/// An async, datagram-oriented UDP socket.
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
    /// Passing port `0` lets the OS choose an ephemeral port.
    pub async fn bind(local_addr: SocketAddr) -> Result<Self, SocketError> {
        let inner = UdpSocket::bind(local_addr).await?;
        let local_addr = inner.local_addr()?;
        Ok(Self { local_addr, inner })
    }

    /// Encode `datagram` and send it as a single UDP datagram to `dest`.
    pub async fn send_to(&self, datagram: &Datagram, dest: SocketAddr) -> Result<(), SocketError> {
        self.inner.send_to(&datagram.encode(), dest).await?;
        Ok(())
    }

    /// Receive the next datagram and decode it.
    ///
    /// Returns `(datagram, sender_address)`.  Datagrams that fail to decode
    /// are returned as [`SocketError::Packet`]; the caller decides whether to
    /// keep listening.
    pub async fn recv_from(&self) -> Result<(Datagram, SocketAddr), SocketError> {
        let mut buf = vec![0u8; MAX_DATAGRAM];
        let (n, from) = self.inner.recv_from(&mut buf).await?;
        let datagram =
            Datagram::decode(&buf[..n]).map_err(|source| SocketError::Packet { from, source })?;
        Ok((datagram, from))
    }
}
