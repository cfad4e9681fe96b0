//! Entry point for `udp-fragment`.
//!
//! Parses CLI arguments and dispatches into either **server** or **client** mode.
//! All protocol work is delegated to library modules; `main.rs` owns only
//! process setup (logging, argument parsing, the domain prompt).

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use dns_query::RecordType;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use udp_fragment::client::Client;
use udp_fragment::codec::{DnsCodec, MessageCodec};
use udp_fragment::config::{self, TransferConfig};
use udp_fragment::server::Server;

/// Deliver a DNS query to a receiver in acknowledged UDP fragments.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand)]
enum Mode {
    /// Receive fragmented queries and print each one once reassembled.
    Server {
        /// Local address to bind.
        #[arg(short, long, default_value = "0.0.0.0")]
        bind: IpAddr,
        #[arg(short, long, default_value_t = config::DEFAULT_PORT)]
        port: u16,
        /// Seconds without a fragment before a partial session is dropped.
        #[arg(long, default_value_t = config::DEFAULT_SESSION_TIMEOUT.as_secs())]
        session_timeout_secs: u64,
    },
    /// Build a DNS query and send it to a server.
    Client {
        /// Receiver address.
        #[arg(short, long, default_value = "127.0.0.1")]
        server: IpAddr,
        #[arg(short, long, default_value_t = config::DEFAULT_PORT)]
        port: u16,
        /// Domain to query; prompted for on stdin when omitted.
        #[arg(short, long)]
        domain: Option<String>,
        #[arg(short = 't', long, default_value = "A")]
        record_type: RecordType,
        #[arg(long, default_value_t = config::DEFAULT_ACK_TIMEOUT.as_millis() as u64)]
        ack_timeout_ms: u64,
        #[arg(long, default_value_t = config::DEFAULT_MAX_RETRIES)]
        max_retries: u32,
        #[arg(long, default_value_t = config::DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG controls verbosity.
    env_logger::init();

    match Cli::parse().mode {
        Mode::Server {
            bind,
            port,
            session_timeout_secs,
        } => {
            let config = TransferConfig {
                port,
                session_timeout: Duration::from_secs(session_timeout_secs),
                ..Default::default()
            };
            run_server(bind, config).await
        }
        Mode::Client {
            server,
            port,
            domain,
            record_type,
            ack_timeout_ms,
            max_retries,
            chunk_size,
        } => {
            let config = TransferConfig {
                port,
                ack_timeout: Duration::from_millis(ack_timeout_ms),
                max_retries,
                chunk_size,
                ..Default::default()
            };
            let domain = match domain {
                Some(d) => d,
                None => prompt_domain().await?,
            };
            run_client(server, config, &domain, record_type).await
        }
    }
}

async fn run_server(bind: IpAddr, config: TransferConfig) -> Result<()> {
    let server = Server::bind(SocketAddr::new(bind, config.port), &config, DnsCodec)
        .await
        .context("failed to start server")?;
    let mut handle = server.run();
    while let Some(query) = handle.next_message().await {
        println!("{query}");
    }
    Ok(())
}

async fn run_client(
    server: IpAddr,
    config: TransferConfig,
    domain: &str,
    record_type: RecordType,
) -> Result<()> {
    let query = dns_query::build_query(domain, record_type);
    let payload = DnsCodec.encode(&query).context("failed to build query")?;

    let client = Client::bind(SocketAddr::new(server, config.port), config).await?;
    let report = client.send(&payload).await?;
    log::info!(
        "session {} delivered in {} fragment(s), {} transmission(s)",
        report.session_id,
        report.fragments,
        report.transmissions
    );
    println!("{}", hex::encode(&payload));
    Ok(())
}

async fn prompt_domain() -> Result<String> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(b"Enter domain name to query: ").await?;
    stdout.flush().await?;

    let mut line = String::new();
    BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
    let domain = line.trim();
    if domain.is_empty() {
        bail!("no domain name given");
    }
    Ok(domain.to_string())
}
