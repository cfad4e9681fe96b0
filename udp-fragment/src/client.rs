//! Sender role: fragment a payload and deliver it with stop-and-wait.
//!
//! ```text
//!  payload ──fragment()──▶ Sender ──release()──▶ Socket ──▶ receiver
//!                            ▲                     │
//!                            └──── on_ack() ◀──────┘  (bounded wait)
//! ```
//!
//! For each fragment, in index order, [`Client`] sends the datagram and waits
//! until `sent_at + ack_timeout` for the matching ack.  Replies for another
//! session or index, malformed datagrams and datagrams from other peers are
//! logged and ignored; they neither consume a retry nor extend the deadline.
//! When the deadline passes the fragment is resent, up to `max_retries`
//! times, after which the transfer is aborted.  Every transfer ends with a
//! single unacknowledged close signal.

use std::error::Error as StdError;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use thiserror::Error;
use tokio::time::timeout_at;

use crate::codec::MessageCodec;
use crate::config::{ConfigError, TransferConfig};
use crate::fragmenter::{fragment, new_session_id};
use crate::packet::Datagram;
use crate::sender::{RetriesExhausted, Sender};
use crate::socket::{Socket, SocketError};

/// Outcome of a fully acknowledged transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferReport {
    pub session_id: u32,
    pub fragments: usize,
    /// Fragment datagrams sent, resends included.
    pub transmissions: u32,
}

#[derive(Error, Debug)]
pub enum TransferError {
    #[error(transparent)]
    Socket(#[from] SocketError),
    #[error("session {session_id} aborted: fragment {index} unacknowledged after {attempts} attempt(s)")]
    Aborted {
        session_id: u32,
        index: u32,
        attempts: u32,
    },
    #[error("could not encode message: {0}")]
    Encode(#[source] Box<dyn StdError + Send + Sync>),
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Sending endpoint bound to one receiver address.
#[derive(Debug)]
pub struct Client {
    socket: Socket,
    server: SocketAddr,
    config: TransferConfig,
}

impl Client {
    /// Bind an ephemeral local socket of the same family as `server`.
    pub async fn bind(server: SocketAddr, config: TransferConfig) -> Result<Self, TransferError> {
        let local: SocketAddr = if server.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = Socket::bind(local).await?;
        Self::from_socket(socket, server, config)
    }

    pub fn from_socket(
        socket: Socket,
        server: SocketAddr,
        config: TransferConfig,
    ) -> Result<Self, TransferError> {
        config.validate()?;
        Ok(Self {
            socket,
            server,
            config,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.socket.local_addr
    }

    pub fn config(&self) -> &TransferConfig {
        &self.config
    }

    /// Encode `message` with `codec` and deliver the bytes.
    pub async fn send_message<C: MessageCodec>(
        &self,
        codec: &C,
        message: &C::Message,
    ) -> Result<TransferReport, TransferError> {
        let payload = codec
            .encode(message)
            .map_err(|e| TransferError::Encode(Box::new(e)))?;
        self.send(&payload).await
    }

    /// Deliver `payload` under a freshly drawn session id.
    pub async fn send(&self, payload: &[u8]) -> Result<TransferReport, TransferError> {
        self.send_session(new_session_id(), payload).await
    }

    /// Deliver `payload` under the given session id.
    pub async fn send_session(
        &self,
        session_id: u32,
        payload: &[u8],
    ) -> Result<TransferReport, TransferError> {
        let fragments = fragment(session_id, payload, self.config.chunk_size);
        log::info!(
            "[client] session {session_id}: {} byte(s) in {} fragment(s) to {}",
            payload.len(),
            fragments.len(),
            self.server
        );
        let mut sender = Sender::new(session_id, fragments, self.config.max_retries);

        while let Some(datagram) = sender.release() {
            self.socket.send_to(datagram, self.server).await?;
            if let Some(entry) = sender.in_flight() {
                log::debug!(
                    "[client] → fragment {}/{} session={}",
                    entry.index + 1,
                    sender.total(),
                    session_id
                );
            }
            if let Err(e) = self.await_ack(&mut sender).await {
                if matches!(e, TransferError::Aborted { .. }) {
                    log::error!("[client] {e}");
                    self.send_close(session_id).await;
                }
                return Err(e);
            }
        }

        self.send_close(session_id).await;
        log::info!(
            "[client] session {session_id} complete after {} transmission(s)",
            sender.transmissions()
        );
        Ok(TransferReport {
            session_id,
            fragments: sender.total(),
            transmissions: sender.transmissions(),
        })
    }

    /// Wait for the in-flight fragment's ack, resending on each expired deadline.
    async fn await_ack(&self, sender: &mut Sender) -> Result<(), TransferError> {
        loop {
            let Some(entry) = sender.in_flight() else {
                return Ok(());
            };
            let deadline = entry.sent_at + self.config.ack_timeout;

            match timeout_at(deadline, self.socket.recv_from()).await {
                Ok(Ok((Datagram::Ack(ack), from))) if from == self.server => {
                    if sender.on_ack(ack) {
                        log::debug!("[client] ← ack {}|{}", ack.session_id, ack.index);
                        return Ok(());
                    }
                    log::debug!(
                        "[client] ignoring stray ack {}|{} (waiting for {}|{})",
                        ack.session_id,
                        ack.index,
                        sender.session_id(),
                        sender.in_flight().map_or(0, |e| e.index)
                    );
                }
                Ok(Ok((datagram, from))) => {
                    log::debug!("[client] ignoring {datagram:?} from {from}");
                }
                Ok(Err(SocketError::Packet { from, source })) => {
                    log::debug!("[client] dropping malformed reply from {from}: {source}");
                }
                Ok(Err(e)) => return Err(e.into()),
                Err(_elapsed) => {
                    let session_id = sender.session_id();
                    match sender.on_timeout() {
                        Ok(None) => return Ok(()),
                        Ok(Some(datagram)) => {
                            self.socket.send_to(datagram, self.server).await?;
                            log::warn!(
                                "[client] timeout: no ack, resending ({}/{})",
                                sender.retransmit_count(),
                                self.config.max_retries
                            );
                        }
                        Err(RetriesExhausted { index, attempts }) => {
                            return Err(TransferError::Aborted {
                                session_id,
                                index,
                                attempts,
                            });
                        }
                    }
                }
            }
        }
    }

    /// Best-effort close signal; the receiver never acknowledges it.
    async fn send_close(&self, session_id: u32) {
        let close = Datagram::Close { session_id };
        match self.socket.send_to(&close, self.server).await {
            Ok(()) => log::debug!("[client] → close session={session_id}"),
            Err(e) => log::warn!("[client] failed to send close for session {session_id}: {e}"),
        }
    }
}
