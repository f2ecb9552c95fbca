//! TOML settings file support.
//!
//! The bridge can be configured entirely from the command line, but a
//! daemonised deployment (systemd unit, container) is easier to manage with
//! a settings file:
//!
//! ```toml
//! [network]
//! listen_address = "0.0.0.0"
//! listen_port = 10000
//!
//! [serial]
//! ports = ["/dev/ttyUSB0", "/dev/ttyUSB1"]
//! baud_rates = [9600, 19200]
//! framing = "raw"
//! chunk_size = 4096
//! ```
//!
//! Every field is optional; absent fields fall back to the same defaults
//! the CLI uses. CLI flags always win over file values, so a file can hold
//! the site configuration while a flag overrides one value for a test run.
//!
//! Unlike an auto-created per-user config, the file here is named
//! explicitly with `--config`, so a missing file is an error rather than a
//! silent fallback to defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use serial_core::config::{DEFAULT_BAUD_RATE, DEFAULT_CHUNK_SIZE};

/// Error type for settings file operations.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// A file system I/O error occurred.
    #[error("I/O error reading settings at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse settings TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level settings file schema.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    #[serde(default)]
    pub network: NetworkSettings,
    #[serde(default)]
    pub serial: SerialSettings,
}

/// Listener settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkSettings {
    /// IP address to bind. `"0.0.0.0"` binds all interfaces.
    #[serde(default = "default_listen_address")]
    pub listen_address: String,
    /// TCP port to listen on.
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,
}

/// Serial port settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SerialSettings {
    /// Ordered device paths; connections are matched in this order.
    #[serde(default)]
    pub ports: Vec<String>,
    /// One rate per port, or a single rate for all, or empty for 9600.
    #[serde(default)]
    pub baud_rates: Vec<u32>,
    /// `"raw"` (default) or `"line"`.
    #[serde(default = "default_framing")]
    pub framing: String,
    /// Pump read chunk size in bytes.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_listen_address() -> String {
    "0.0.0.0".to_string()
}
fn default_listen_port() -> u16 {
    10000
}
fn default_framing() -> String {
    "raw".to_string()
}
fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
            listen_port: default_listen_port(),
        }
    }
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            ports: Vec::new(),
            baud_rates: Vec::new(),
            framing: default_framing(),
            chunk_size: default_chunk_size(),
        }
    }
}

/// Loads and parses the settings file at `path`.
///
/// # Errors
///
/// Returns [`SettingsError::Io`] when the file cannot be read (including
/// when it does not exist) and [`SettingsError::Parse`] for malformed TOML.
pub fn load_settings(path: &Path) -> Result<Settings, SettingsError> {
    let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&content)?)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_match_cli_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.network.listen_address, "0.0.0.0");
        assert_eq!(settings.network.listen_port, 10000);
        assert!(settings.serial.ports.is_empty());
        assert!(settings.serial.baud_rates.is_empty());
        assert_eq!(settings.serial.framing, "raw");
        assert_eq!(settings.serial.chunk_size, DEFAULT_CHUNK_SIZE);
        // Default baud lives in the config layer; the file just omits rates.
        assert_eq!(DEFAULT_BAUD_RATE, 9600);
    }

    #[test]
    fn test_full_settings_file_parses() {
        let toml_str = r#"
[network]
listen_address = "127.0.0.1"
listen_port = 9000

[serial]
ports = ["/dev/ttyUSB0", "/dev/ttyUSB1"]
baud_rates = [9600, 19200]
framing = "line"
chunk_size = 1024
"#;

        let settings: Settings = toml::from_str(toml_str).expect("parse");
        assert_eq!(settings.network.listen_address, "127.0.0.1");
        assert_eq!(settings.network.listen_port, 9000);
        assert_eq!(settings.serial.ports.len(), 2);
        assert_eq!(settings.serial.baud_rates, vec![9600, 19200]);
        assert_eq!(settings.serial.framing, "line");
        assert_eq!(settings.serial.chunk_size, 1024);
    }

    #[test]
    fn test_partial_settings_file_uses_defaults_for_the_rest() {
        let toml_str = r#"
[serial]
ports = ["COM8"]
"#;

        let settings: Settings = toml::from_str(toml_str).expect("parse");
        // Section absent entirely: full default.
        assert_eq!(settings.network.listen_port, 10000);
        // Section present, fields absent: per-field defaults.
        assert_eq!(settings.serial.framing, "raw");
        assert_eq!(settings.serial.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(settings.serial.ports, vec!["COM8".to_string()]);
    }

    #[test]
    fn test_empty_file_parses_to_defaults() {
        let settings: Settings = toml::from_str("").expect("parse empty");
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_invalid_toml_returns_parse_error() {
        let result: Result<Settings, toml::de::Error> = toml::from_str("[[[ not valid toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_file_returns_io_error() {
        let result = load_settings(Path::new("/nonexistent/serial-bridge/config.toml"));
        assert!(matches!(result, Err(SettingsError::Io { .. })));
    }

    #[test]
    fn test_settings_round_trip_through_toml() {
        let mut settings = Settings::default();
        settings.serial.ports = vec!["/dev/ttyACM0".to_string()];
        settings.serial.baud_rates = vec![115200];

        let serialized = toml::to_string_pretty(&settings).expect("serialize");
        let restored: Settings = toml::from_str(&serialized).expect("deserialize");
        assert_eq!(settings, restored);
    }
}
