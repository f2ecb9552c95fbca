//! Bridge configuration types.
//!
//! [`BridgeConfig`] is the single source of truth for all runtime settings.
//! The binary crate populates it from CLI arguments and/or a TOML settings
//! file; this module only validates and holds the result, so it stays easy
//! to construct in tests.
//!
//! Validation happens entirely in [`BridgeConfig::new`], before any serial
//! port is opened. A path/baud-rate count mismatch is therefore rejected
//! with no partial side effects.

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use thiserror::Error;

/// Default read chunk size for both pump directions, in bytes.
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Default serial baud rate, applied when no rate is configured.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Error type for configuration validation failures.
///
/// All of these are fatal at startup: the engine refuses to run with a
/// configuration it cannot honor exactly. A silently shortened or padded
/// port list would break the one-connection-per-port expectations of the
/// clients, so counts must line up before anything is opened.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The serial path list and baud rate list have incompatible lengths.
    #[error(
        "{paths} serial path(s) but {rates} baud rate(s); give one rate per port or a single rate for all"
    )]
    PortCountMismatch { paths: usize, rates: usize },

    /// No serial ports were configured at all.
    #[error("no serial ports configured; nothing to bridge")]
    NoSerialPorts,

    /// The pump chunk size was zero.
    #[error("chunk size must be at least 1 byte")]
    InvalidChunkSize,

    /// A framing mode string did not match a known variant.
    #[error("unknown framing mode '{0}' (expected 'raw' or 'line')")]
    UnknownFraming(String),
}

/// One serial port to bridge: device path plus fixed baud rate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialPortConfig {
    /// Device path, e.g. `/dev/ttyUSB0` on Linux or `COM8` on Windows.
    pub path: String,
    /// Baud rate the port is opened with. Fixed for the process lifetime.
    pub baud_rate: u32,
}

impl SerialPortConfig {
    /// Creates a port config from a path and baud rate.
    pub fn new(path: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            path: path.into(),
            baud_rate,
        }
    }
}

impl fmt::Display for SerialPortConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {} baud", self.path, self.baud_rate)
    }
}

/// Chunking policy for the serial-to-network pump.
///
/// This is a byte-stream chunking policy, not a protocol: neither variant
/// interprets payload content.
///
/// `Raw` is the default. Line framing stalls on binary payloads that never
/// contain the delimiter, so it must be asked for explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Framing {
    /// Fixed-size chunk reads; bytes are forwarded as soon as they arrive.
    #[default]
    Raw,
    /// Newline-delimited reads; each complete line (delimiter included) is
    /// forwarded as one write.
    Line,
}

impl FromStr for Framing {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "raw" | "chunked" => Ok(Framing::Raw),
            "line" | "lines" => Ok(Framing::Line),
            other => Err(ConfigError::UnknownFraming(other.to_string())),
        }
    }
}

impl fmt::Display for Framing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Framing::Raw => f.write_str("raw"),
            Framing::Line => f.write_str("line"),
        }
    }
}

/// All validated runtime configuration for the bridge engine.
///
/// Build this once at startup and hand it to `Engine::start`. The port list
/// order matters: connections are matched to ports strictly in this order.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Address and port the TCP listener binds to.
    pub listen_addr: SocketAddr,
    /// Ordered serial ports, matched to connections first-come first-served.
    pub ports: Vec<SerialPortConfig>,
    /// Chunking policy for the serial-to-network direction.
    pub framing: Framing,
    /// Read chunk size for both pumps, in bytes.
    pub chunk_size: usize,
}

impl BridgeConfig {
    /// Validates and assembles a bridge configuration.
    ///
    /// Baud rate pairing rules:
    ///
    /// - one rate per path: rates are zipped with paths in order;
    /// - a single rate: applied to every path;
    /// - no rates at all: every path gets [`DEFAULT_BAUD_RATE`];
    /// - anything else is a [`ConfigError::PortCountMismatch`].
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the port list is empty, the counts do
    /// not line up, or `chunk_size` is zero. No serial port is opened before
    /// these checks pass.
    pub fn new(
        listen_addr: SocketAddr,
        paths: Vec<String>,
        baud_rates: Vec<u32>,
        framing: Framing,
        chunk_size: usize,
    ) -> Result<Self, ConfigError> {
        if paths.is_empty() {
            return Err(ConfigError::NoSerialPorts);
        }
        if chunk_size == 0 {
            return Err(ConfigError::InvalidChunkSize);
        }

        let rates = resolve_baud_rates(paths.len(), baud_rates)?;
        let ports = paths
            .into_iter()
            .zip(rates)
            .map(|(path, baud_rate)| SerialPortConfig { path, baud_rate })
            .collect();

        Ok(Self {
            listen_addr,
            ports,
            framing,
            chunk_size,
        })
    }
}

/// Expands the configured baud rate list to exactly one rate per path.
fn resolve_baud_rates(path_count: usize, rates: Vec<u32>) -> Result<Vec<u32>, ConfigError> {
    match rates.len() {
        0 => Ok(vec![DEFAULT_BAUD_RATE; path_count]),
        1 => Ok(vec![rates[0]; path_count]),
        n if n == path_count => Ok(rates),
        n => Err(ConfigError::PortCountMismatch {
            paths: path_count,
            rates: n,
        }),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
