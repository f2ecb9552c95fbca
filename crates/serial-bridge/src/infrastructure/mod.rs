//! Infrastructure layer for serial-bridge.
//!
//! Everything that touches the outside world lives here:
//!
//! - Binding the TCP listener and running the accept loop
//! - Opening serial devices with tokio-serial
//! - Reading the optional TOML settings file
//!
//! # What does NOT belong here?
//!
//! - Forwarding logic and session lifecycle (that is `serial-core`)
//! - Startup ordering and drain semantics (that is the application layer)
//! - CLI parsing (that is done in `main.rs`)

pub mod listener;
pub mod serial;
pub mod settings;

pub use serial::{PortOpener, SystemPortOpener};
pub use settings::{load_settings, Settings, SettingsError};
