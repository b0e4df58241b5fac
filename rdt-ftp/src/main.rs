//! Entry point for `rdt-ftp`.
//!
//! Parses CLI arguments and dispatches into either **send** or **receive**
//! mode.  All protocol work is delegated to library modules; `main.rs` owns
//! only process setup (logging, argument parsing, address resolution).

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};

use rdt_ftp::config::{DEFAULT_LINGER, DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT};
use rdt_ftp::{receive_file, send_file, Config};

/// Reliable file transfer over UDP (stop-and-wait).
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    mode: Mode,

    #[command(flatten)]
    tuning: Tuning,
}

#[derive(Subcommand)]
enum Mode {
    /// Send a local file to a waiting receiver.
    Send {
        /// File to send.
        source: PathBuf,
        /// Receiver address (e.g. 127.0.0.1:9000 or host:9000).
        dest: String,
        /// Name the receiver stores the file under.
        dest_name: String,
    },
    /// Wait for one incoming file.
    Receive {
        /// UDP port to listen on.
        port: u16,
        /// Local address to bind; use :: for IPv6 senders.
        #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
        listen: IpAddr,
        /// Directory the received file is written into.
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,
    },
}

#[derive(Args)]
struct Tuning {
    /// Per-attempt reply timeout in milliseconds.
    #[arg(long, global = true, default_value_t = DEFAULT_TIMEOUT.as_millis() as u64)]
    timeout_ms: u64,
    /// Consecutive failed attempts tolerated per packet.
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_RETRIES)]
    max_retries: u32,
    /// How long the receiver keeps answering late FINs, in milliseconds.
    #[arg(long, global = true, default_value_t = DEFAULT_LINGER.as_millis() as u64)]
    linger_ms: u64,
}

impl Tuning {
    fn config(&self) -> Config {
        Config::new(
            Duration::from_millis(self.timeout_ms),
            self.max_retries,
            Duration::from_millis(self.linger_ms),
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise env_logger; set RUST_LOG to control verbosity.
    env_logger::init();

    let cli = Cli::parse();
    let config = cli.tuning.config();

    match cli.mode {
        Mode::Send {
            source,
            dest,
            dest_name,
        } => {
            let peer = tokio::net::lookup_host(&dest)
                .await
                .with_context(|| format!("cannot resolve {dest}"))?
                .next()
                .with_context(|| format!("no address found for {dest}"))?;

            log::info!("Sending {} to {peer} as {dest_name:?}", source.display());
            let report = send_file(&source, peer, &dest_name, config)
                .await
                .with_context(|| format!("sending {} failed", source.display()))?;

            println!(
                "Sent {} bytes as {:?} in {:.3}s ({} packets, {} retransmissions)",
                report.bytes,
                report.file_name,
                report.elapsed.as_secs_f64(),
                report.data_packets,
                report.retransmissions
            );
        }
        Mode::Receive {
            port,
            listen,
            output_dir,
        } => {
            if !output_dir.is_dir() {
                bail!("output directory {} does not exist", output_dir.display());
            }
            let report = receive_file(SocketAddr::new(listen, port), output_dir.clone(), config)
                .await
                .context("receive failed")?;

            println!(
                "Received {} ({} bytes) into {}",
                report.file_name,
                report.bytes,
                output_dir.display()
            );
        }
    }

    Ok(())
}
