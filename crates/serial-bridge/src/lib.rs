//! serial-bridge library crate.
//!
//! This crate provides the deployable half of Serial-Over-IP: it opens the
//! configured serial ports, listens for TCP connections, and hands matched
//! pairs to the session machinery in `serial-core`.
//!
//! # Architecture
//!
//! ```text
//! TCP client (raw byte stream)
//!         ↕
//! [serial-bridge]
//!   ├── application/
//!   │     └── engine/     Engine: startup, drain, forced shutdown
//!   └── infrastructure/
//!         ├── listener/   TCP accept loop, port matching
//!         ├── serial/     tokio-serial port opening (PortOpener seam)
//!         └── settings/   TOML settings file
//!         ↕
//! serial device (/dev/ttyUSB0, COM8, ...)
//! ```
//!
//! # Layer rules
//!
//! - `application` orchestrates startup and lifetime; it owns no sockets
//!   directly and is generic over the serial handle type.
//! - `infrastructure` does the I/O: binding, accepting, opening devices,
//!   reading the settings file.
//! - The forwarding logic itself (pool, pumps, sessions) lives in
//!   `serial-core` and is shared with the tests, which drive it over
//!   in-memory streams instead of real hardware.

/// Application layer: engine lifecycle orchestration.
pub mod application;

/// Infrastructure layer: TCP listener, serial port opening, settings file.
pub mod infrastructure;

// Re-export the engine so embedders and integration tests can write
// `serial_bridge::Engine` directly.
pub use application::engine::{Engine, StartupError};
