//! Lossy network simulator for exercising retransmission.
//!
//! Real networks drop and duplicate packets.  To exercise the reliability
//! mechanisms without depending on actual network conditions, [`Simulator`]
//! is a UDP relay placed between a sender and a receiver.  The sender
//! targets the relay's address instead of the receiver's; every datagram is
//! forwarded to the other side after the fault model has had its say:
//!
//! | Fault       | Description                                   |
//! |-------------|-----------------------------------------------|
//! | Loss        | Drop a datagram with probability `loss_rate`. |
//! | Duplication | Deliver a datagram twice.                     |
//!
//! Faults apply in both directions, so acks are lost as often as fragments.
//! The RNG is seeded from [`SimulatorConfig::seed`], which makes the sequence
//! of fault decisions reproducible from run to run.
//!
//! The relay remembers the most recent non-upstream peer as "the client" and
//! routes upstream replies there; it is meant for one sender at a time.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;

use crate::packet::Datagram;

/// Configuration for the fault-injection model.
///
/// Probabilities are clamped to `[0.0, 1.0]`; NaN counts as `0.0`.
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Probability that any given datagram is silently dropped.
    pub loss_rate: f64,
    /// Probability that a forwarded datagram is sent a second time.
    pub duplicate_rate: f64,
    pub seed: u64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        // No faults: a transparent pass-through.
        Self {
            loss_rate: 0.0,
            duplicate_rate: 0.0,
            seed: 0,
        }
    }
}

/// Running totals, readable while the relay is active.
#[derive(Debug, Default)]
pub struct SimulatorStats {
    forwarded: AtomicU64,
    dropped: AtomicU64,
    duplicated: AtomicU64,
}

impl SimulatorStats {
    pub fn forwarded(&self) -> u64 {
        self.forwarded.load(Ordering::Relaxed)
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn duplicated(&self) -> u64 {
        self.duplicated.load(Ordering::Relaxed)
    }
}

/// A fault-injecting UDP relay.
pub struct Simulator {
    socket: UdpSocket,
    upstream: SocketAddr,
    client: Option<SocketAddr>,
    loss_rate: f64,
    duplicate_rate: f64,
    rng: StdRng,
    stats: Arc<SimulatorStats>,
}

impl Simulator {
    /// Bind the relay on `local`, forwarding to `upstream`.
    pub async fn bind(
        local: SocketAddr,
        upstream: SocketAddr,
        config: SimulatorConfig,
    ) -> std::io::Result<Self> {
        let socket = UdpSocket::bind(local).await?;
        Ok(Self {
            socket,
            upstream,
            client: None,
            loss_rate: probability(config.loss_rate),
            duplicate_rate: probability(config.duplicate_rate),
            rng: StdRng::seed_from_u64(config.seed),
            stats: Arc::default(),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn stats(&self) -> Arc<SimulatorStats> {
        Arc::clone(&self.stats)
    }

    /// Spawn the relay loop in the background.
    pub fn spawn(self) -> JoinHandle<std::io::Result<()>> {
        tokio::spawn(self.run())
    }

    /// Relay datagrams until a socket error occurs.
    pub async fn run(mut self) -> std::io::Result<()> {
        let mut buf = vec![0u8; 65_535];
        loop {
            let (n, from) = self.socket.recv_from(&mut buf).await?;
            let dest = if from == self.upstream {
                match self.client {
                    Some(client) => client,
                    None => {
                        log::debug!("[sim] upstream datagram before any client, dropped");
                        continue;
                    }
                }
            } else {
                self.client = Some(from);
                self.upstream
            };
            let bytes = &buf[..n];

            if self.rng.random_bool(self.loss_rate) {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                log::debug!("[sim] drop {}", describe(bytes));
                continue;
            }
            self.socket.send_to(bytes, dest).await?;
            self.stats.forwarded.fetch_add(1, Ordering::Relaxed);

            if self.rng.random_bool(self.duplicate_rate) {
                self.socket.send_to(bytes, dest).await?;
                self.stats.duplicated.fetch_add(1, Ordering::Relaxed);
                log::debug!("[sim] duplicate {}", describe(bytes));
            }
        }
    }
}

fn probability(p: f64) -> f64 {
    if p.is_nan() {
        0.0
    } else {
        p.clamp(0.0, 1.0)
    }
}

fn describe(bytes: &[u8]) -> String {
    match Datagram::decode(bytes) {
        Ok(Datagram::Fragment(f)) => format!("fragment {}|{}/{}", f.session_id, f.index, f.total),
        Ok(Datagram::Close { session_id }) => format!("close {session_id}"),
        Ok(Datagram::Ack(a)) => format!("ack {}|{}", a.session_id, a.index),
        Err(_) => format!("{} raw byte(s)", bytes.len()),
    }
}
