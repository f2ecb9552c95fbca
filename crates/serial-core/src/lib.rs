//! # serial-core
//!
//! Shared library for Serial-Over-IP containing the port pool, the
//! bidirectional forwarding pumps, and the session lifecycle machinery.
//!
//! This crate is used by the `serial-bridge` binary. It has zero dependencies
//! on serial hardware or network sockets: every forwarding primitive is
//! generic over `AsyncRead + AsyncWrite`, so the whole engine core can be
//! exercised in tests with `tokio::io::duplex` streams.
//!
//! # Architecture overview
//!
//! Serial-Over-IP pairs each incoming TCP connection with one serial port
//! from a fixed, ordered pool, then moves raw bytes in both directions until
//! either side disconnects. This crate defines:
//!
//! - **`config`** – The validated bridge configuration: listen address,
//!   ordered `(path, baud rate)` port list, and the chunking policy for the
//!   serial-to-network direction.
//!
//! - **`pool`** – The first-come first-served pool of opened serial ports.
//!   `take()` is the single synchronization point shared across sessions:
//!   it atomically hands the head of the queue to exactly one caller.
//!
//! - **`pump`** – One-directional byte-copy loops. A pump reads a chunk,
//!   writes it verbatim until fully consumed, and exits on EOF, I/O error,
//!   or a shutdown signal.
//!
//! - **`session`** – The paired lifecycle of one connection and one serial
//!   port: two pumps, a session-local shutdown signal, and a
//!   `Created → Running → Draining → Closed` state machine.
//!
//! - **`shutdown`** – The broadcastable shutdown signal observed by pumps
//!   and the accept loop at every loop boundary.

pub mod config;
pub mod pool;
pub mod pump;
pub mod session;
pub mod shutdown;

// Re-export the most-used types at the crate root so callers can write
// `serial_core::PortPool` instead of `serial_core::pool::PortPool`.
pub use config::{BridgeConfig, ConfigError, Framing, SerialPortConfig};
pub use pool::{PoolEmpty, PooledPort, PortPool};
pub use pump::{PumpOutcome, PumpReport};
pub use session::{run_session, SessionId, SessionState, SessionSummary};
pub use shutdown::{ShutdownController, ShutdownListener};
