//! Receiver role: accept one session at a time, ack, reassemble, decode.
//!
//! # Usage
//!
//! **Direct**: drive the loop yourself with [`Server::serve`], handing it the
//! channel that decoded messages should be published on.
//!
//! **Background**: [`Server::run`] spawns the loop and returns a
//! [`ServerHandle`] to pull messages from:
//!
//! ```no_run
//! # async fn demo() -> Result<(), udp_fragment::server::ServerError> {
//! use udp_fragment::codec::DnsCodec;
//! use udp_fragment::config::TransferConfig;
//! use udp_fragment::server::Server;
//!
//! let server = Server::bind("127.0.0.1:5353".parse().unwrap(), &TransferConfig::default(), DnsCodec).await?;
//! let mut handle = server.run();
//! while let Some(query) = handle.next_message().await {
//!     println!("{query}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! The loop is the only owner of the [`SessionTracker`], so the session slot
//! needs no locking.  Each iteration races the next inbound datagram against
//! the inactivity deadline.  Malformed datagrams and transient socket errors
//! are logged and never stop the loop.

use std::net::SocketAddr;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::codec::MessageCodec;
use crate::config::{ConfigError, TransferConfig};
use crate::packet::{Ack, Datagram};
use crate::reassembly::Reassembled;
use crate::session::{Rejection, SessionTracker, Verdict};
use crate::socket::{Socket, SocketError};

/// Capacity of the decoded-message channel used by [`Server::run`].
const MESSAGE_QUEUE: usize = 64;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error(transparent)]
    Socket(#[from] SocketError),
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Receiving endpoint.
#[derive(Debug)]
pub struct Server<C> {
    socket: Socket,
    tracker: SessionTracker,
    codec: C,
}

impl<C> Server<C>
where
    C: MessageCodec + Send + Sync + 'static,
    C::Message: Send + 'static,
{
    pub async fn bind(
        addr: SocketAddr,
        config: &TransferConfig,
        codec: C,
    ) -> Result<Self, ServerError> {
        config.validate()?;
        let socket = Socket::bind(addr).await?;
        log::info!("[server] listening on {}", socket.local_addr);
        Ok(Self {
            socket,
            tracker: SessionTracker::new(config.session_timeout),
            codec,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.socket.local_addr
    }

    /// Spawn [`Server::serve`] on the runtime.
    pub fn run(self) -> ServerHandle<C::Message> {
        let (tx, rx) = mpsc::channel(MESSAGE_QUEUE);
        let local_addr = self.local_addr();
        let handle = tokio::spawn(self.serve(tx));
        ServerHandle {
            local_addr,
            messages: rx,
            handle,
        }
    }

    /// Receive forever, publishing every successfully decoded message on
    /// `out`.  Returns once `out` has been closed by its receiver.
    pub async fn serve(mut self, out: mpsc::Sender<C::Message>) {
        loop {
            let expired = self.tracker.timer().expired();

            tokio::select! {
                result = self.socket.recv_from() => match result {
                    Ok((datagram, from)) => {
                        if let Some(done) = self.handle_datagram(datagram, from).await {
                            if !self.publish(done, &out).await {
                                log::debug!("[server] message consumer gone, stopping");
                                return;
                            }
                        }
                    }
                    Err(SocketError::Packet { from, source }) => {
                        log::warn!("[server] dropping malformed datagram from {from}: {source}");
                    }
                    Err(e) => log::warn!("[server] receive failed: {e}"),
                },
                _ = expired => {
                    if let Some(session) = self.tracker.expire(Instant::now()) {
                        log::warn!(
                            "[server] session {} timed out with {}/{} fragment(s), discarded",
                            session.id(),
                            session.received(),
                            session.total()
                        );
                    }
                }
            }
        }
    }

    /// Apply one datagram to the session slot and send any ack it earns.
    async fn handle_datagram(
        &mut self,
        datagram: Datagram,
        from: SocketAddr,
    ) -> Option<Reassembled> {
        match self.tracker.on_datagram(datagram, Instant::now()) {
            Verdict::Accepted { ack, completed } => {
                self.send_ack(ack, from).await;
                completed
            }
            Verdict::Closed { discarded: Some(id) } => {
                log::info!("[server] close from {from}: session {id} cleared");
                None
            }
            Verdict::Closed { discarded: None } => {
                log::debug!("[server] close from {from} with no active session");
                None
            }
            Verdict::Rejected(Rejection::SessionMismatch { expected, got }) => {
                log::warn!(
                    "[server] dropping fragment for session {got} from {from} (busy with {expected})"
                );
                None
            }
            Verdict::Rejected(Rejection::TotalMismatch {
                session_id,
                expected,
                got,
            }) => {
                log::warn!(
                    "[server] session {session_id}: fragment claims {got} total, expected {expected}; dropped"
                );
                None
            }
            Verdict::Rejected(Rejection::UnexpectedAck(ack)) => {
                log::debug!("[server] ignoring ack {}|{} from {from}", ack.session_id, ack.index);
                None
            }
        }
    }

    async fn send_ack(&self, ack: Ack, to: SocketAddr) {
        match self.socket.send_to(&Datagram::Ack(ack), to).await {
            Ok(()) => log::debug!("[server] → ack {}|{} to {to}", ack.session_id, ack.index),
            Err(e) => log::warn!("[server] failed to ack {}|{}: {e}", ack.session_id, ack.index),
        }
    }

    /// Decode a finished payload and forward it.  `false` once nobody listens.
    async fn publish(&self, done: Reassembled, out: &mpsc::Sender<C::Message>) -> bool {
        log::info!(
            "[server] session {} complete: {} byte(s) reassembled",
            done.session_id,
            done.payload.len()
        );
        match done.decode(&self.codec) {
            Ok(message) => out.send(message).await.is_ok(),
            Err(e) => {
                log::error!("[server] session {}: could not decode payload: {e}", done.session_id);
                !out.is_closed()
            }
        }
    }
}

/// Handle returned by [`Server::run`].
#[derive(Debug)]
pub struct ServerHandle<M> {
    pub local_addr: SocketAddr,
    messages: mpsc::Receiver<M>,
    handle: JoinHandle<()>,
}

impl<M> ServerHandle<M> {
    /// Next decoded message, or `None` if the loop has stopped.
    pub async fn next_message(&mut self) -> Option<M> {
        self.messages.recv().await
    }

    /// Stop the background loop and wait for it to wind down.
    pub async fn shutdown(self) {
        self.handle.abort();
        let _ = self.handle.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::RawCodec;
    use crate::packet::Fragment;
    use std::time::Duration;
    use tokio::net::UdpSocket;

    async fn local_server(config: TransferConfig) -> ServerHandle<Vec<u8>> {
        Server::bind("127.0.0.1:0".parse().unwrap(), &config, RawCodec)
            .await
            .unwrap()
            .run()
    }

    async fn send(sock: &UdpSocket, to: SocketAddr, d: Datagram) {
        sock.send_to(&d.encode(), to).await.unwrap();
    }

    async fn recv_ack(sock: &UdpSocket) -> Option<Ack> {
        let mut buf = [0u8; 128];
        let (n, _) = tokio::time::timeout(Duration::from_millis(300), sock.recv_from(&mut buf))
            .await
            .ok()?
            .ok()?;
        match Datagram::decode(&buf[..n]).ok()? {
            Datagram::Ack(a) => Some(a),
            _ => None,
        }
    }

    #[tokio::test]
    async fn rejects_invalid_config() {
        let config = TransferConfig {
            chunk_size: 0,
            ..Default::default()
        };
        let err = Server::bind("127.0.0.1:0".parse().unwrap(), &config, RawCodec)
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::Config(ConfigError::ZeroChunkSize)));
    }

    #[tokio::test]
    async fn malformed_datagram_does_not_stop_the_loop() {
        let mut server = local_server(TransferConfig::default()).await;
        let peer = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        peer.send_to(b"garbage", server.local_addr).await.unwrap();
        peer.send_to(b"1|2|3|zz", server.local_addr).await.unwrap();
        assert_eq!(recv_ack(&peer).await, None);

        let frag = Fragment {
            session_id: 5,
            index: 0,
            total: 1,
            chunk: b"ok".to_vec(),
        };
        send(&peer, server.local_addr, Datagram::Fragment(frag)).await;
        assert_eq!(recv_ack(&peer).await, Some(Ack { session_id: 5, index: 0 }));
        assert_eq!(server.next_message().await.unwrap(), b"ok");
        server.shutdown().await;
    }

    #[tokio::test]
    async fn ack_goes_to_fragment_source() {
        let server = local_server(TransferConfig::default()).await;
        let a = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let b = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        let frag = |index| Fragment {
            session_id: 77,
            index,
            total: 3,
            chunk: vec![index as u8],
        };
        send(&a, server.local_addr, Datagram::Fragment(frag(0))).await;
        assert_eq!(recv_ack(&a).await, Some(Ack { session_id: 77, index: 0 }));
        send(&b, server.local_addr, Datagram::Fragment(frag(1))).await;
        assert_eq!(recv_ack(&b).await, Some(Ack { session_id: 77, index: 1 }));
        assert_eq!(recv_ack(&a).await, None);
        server.shutdown().await;
    }
}
