//! Serial-Over-IP bridge — entry point.
//!
//! This binary gives local serial ports a network presence: it listens for
//! TCP connections and pairs each one with the next free configured port,
//! then forwards raw bytes in both directions until either side hangs up.
//! There is no protocol layer; clients see the serial line as a transparent
//! byte stream.
//!
//! # Usage
//!
//! ```text
//! serial-bridge [OPTIONS]
//!
//! Options:
//!   --listen-port <PORT>       TCP listen port [default: 10000]
//!   --listen-addr <ADDR>       Bind address [default: 0.0.0.0]
//!   --ports <P1,P2,...>        Comma-separated serial device paths
//!   --baud-rates <B1,B2,...>   One rate per port, or a single rate for all
//!                              [default: 9600]
//!   --framing <raw|line>       serial→network chunking policy [default: raw]
//!   --chunk-size <BYTES>       Pump read chunk size [default: 4096]
//!   --config <PATH>            TOML settings file (CLI flags override it)
//! ```
//!
//! # Environment variable overrides
//!
//! Each flag can also be supplied via environment variable; explicit CLI
//! args take precedence, and both take precedence over the settings file.
//!
//! | Variable                    | Description                       |
//! |-----------------------------|-----------------------------------|
//! | `SERIAL_BRIDGE_LISTEN_PORT` | TCP listen port                   |
//! | `SERIAL_BRIDGE_LISTEN_ADDR` | Bind address                      |
//! | `SERIAL_BRIDGE_PORTS`       | Comma-separated device paths      |
//! | `SERIAL_BRIDGE_BAUD_RATES`  | Comma-separated baud rates        |
//! | `SERIAL_BRIDGE_FRAMING`     | `raw` or `line`                   |
//! | `SERIAL_BRIDGE_CHUNK_SIZE`  | Pump read chunk size in bytes     |
//!
//! # Lifecycle
//!
//! The bridge serves exactly one connection per configured port and then
//! drains: once the last port is matched the listener closes, and the
//! process exits cleanly after the last session ends. Ctrl-C forces the
//! same drain early. Startup failures (unopenable port, unbindable
//! address, inconsistent configuration) exit non-zero before any client is
//! served.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use serial_core::{BridgeConfig, Framing};

use serial_bridge::infrastructure::settings::{load_settings, Settings};
use serial_bridge::Engine;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Serial-Over-IP bridge.
///
/// Pairs each incoming TCP connection with one configured serial port,
/// first come first served, and forwards raw bytes both ways.
///
/// Flags deliberately have no clap-level defaults: a flag left unset falls
/// back to the settings file value and only then to the built-in default,
/// so `Option`/empty-vec sentinels are how "unset" is represented here.
#[derive(Debug, Parser)]
#[command(
    name = "serial-bridge",
    about = "Bridge local serial ports to TCP clients, one connection per port",
    version
)]
struct Cli {
    /// TCP port to listen on [default: 10000].
    #[arg(long, env = "SERIAL_BRIDGE_LISTEN_PORT")]
    listen_port: Option<u16>,

    /// IP address to bind. `0.0.0.0` accepts connections from any
    /// interface; `127.0.0.1` restricts to local clients [default: 0.0.0.0].
    #[arg(long, env = "SERIAL_BRIDGE_LISTEN_ADDR")]
    listen_addr: Option<String>,

    /// Comma-separated serial device paths, e.g.
    /// `/dev/ttyUSB0,/dev/ttyUSB1` or `COM7,COM8`. Connections are matched
    /// to ports in exactly this order.
    #[arg(long, value_delimiter = ',', env = "SERIAL_BRIDGE_PORTS")]
    ports: Vec<String>,

    /// Comma-separated baud rates. Give one rate per port, or a single
    /// rate that applies to every port [default: 9600].
    #[arg(long, value_delimiter = ',', env = "SERIAL_BRIDGE_BAUD_RATES")]
    baud_rates: Vec<u32>,

    /// Chunking policy for the serial→network direction: `raw` forwards
    /// bytes as they arrive, `line` groups them by newline [default: raw].
    #[arg(long, env = "SERIAL_BRIDGE_FRAMING")]
    framing: Option<String>,

    /// Read chunk size for both directions, in bytes [default: 4096].
    #[arg(long, env = "SERIAL_BRIDGE_CHUNK_SIZE")]
    chunk_size: Option<usize>,

    /// Optional TOML settings file; explicit CLI flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Cli {
    /// Merges CLI flags over file settings over built-in defaults and
    /// validates the result into a [`BridgeConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error for an unparsable bind address, an unknown framing
    /// mode, or any count/validity violation caught by
    /// [`BridgeConfig::new`].
    fn into_bridge_config(self, file: Settings) -> anyhow::Result<BridgeConfig> {
        let listen_addr = self
            .listen_addr
            .unwrap_or(file.network.listen_address);
        let listen_port = self.listen_port.unwrap_or(file.network.listen_port);
        let listen_addr: SocketAddr = format!("{listen_addr}:{listen_port}")
            .parse()
            .with_context(|| format!("invalid listen address: '{listen_addr}:{listen_port}'"))?;

        let ports = if self.ports.is_empty() {
            file.serial.ports
        } else {
            self.ports
        };
        let baud_rates = if self.baud_rates.is_empty() {
            file.serial.baud_rates
        } else {
            self.baud_rates
        };

        let framing: Framing = self
            .framing
            .unwrap_or(file.serial.framing)
            .parse()
            .context("invalid --framing value")?;
        let chunk_size = self.chunk_size.unwrap_or(file.serial.chunk_size);

        BridgeConfig::new(listen_addr, ports, baud_rates, framing, chunk_size)
            .context("invalid bridge configuration")
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging. Level is overridden by `RUST_LOG`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let file_settings = match &cli.config {
        Some(path) => load_settings(path)
            .with_context(|| format!("failed to load settings file {}", path.display()))?,
        None => Settings::default(),
    };
    let config = cli.into_bridge_config(file_settings)?;

    info!(
        "Serial-Over-IP bridge starting — listen={}, {} serial port(s), framing={}",
        config.listen_addr,
        config.ports.len(),
        config.framing,
    );

    // Startup is all-or-nothing: any port that fails to open or a bind
    // failure aborts here with a non-zero exit code.
    let engine = Engine::start(config).await?;

    // Ctrl-C forces an early drain; the normal exit path is pool
    // exhaustion followed by the last session closing.
    let shutdown = engine.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received; draining sessions");
            shutdown.trigger();
        }
    });

    engine.wait_until_drained().await;

    info!("Serial-Over-IP bridge stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
