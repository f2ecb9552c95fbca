//! Serial port opening.
//!
//! [`PortOpener`] is the seam between the engine and the hardware: the
//! production implementation opens a `tokio_serial::SerialStream`, and
//! tests substitute an opener that hands out in-memory duplex streams.
//!
//! Ports are opened 8N1 with no flow control, the near-universal default
//! for the instruments and embedded boards this bridge fronts. The open
//! call itself runs inside `spawn_blocking`: device initialisation can
//! stall on slow USB adapters and must not block the runtime.

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_serial::{SerialPortBuilderExt, SerialStream};

use serial_core::SerialPortConfig;

/// Opens one serial port from its configuration.
#[async_trait]
pub trait PortOpener {
    /// The handle type produced by this opener.
    type Port: AsyncRead + AsyncWrite + Send + 'static;

    /// Opens `config.path` at `config.baud_rate`.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error when the device cannot be opened
    /// (missing device node, permissions, already in use).
    async fn open(&self, config: &SerialPortConfig) -> std::io::Result<Self::Port>;
}

/// The production opener: real devices via tokio-serial.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemPortOpener;

#[async_trait]
impl PortOpener for SystemPortOpener {
    type Port = SerialStream;

    async fn open(&self, config: &SerialPortConfig) -> std::io::Result<SerialStream> {
        let path = config.path.clone();
        let baud_rate = config.baud_rate;

        tokio::task::spawn_blocking(move || {
            tokio_serial::new(&path, baud_rate)
                .data_bits(tokio_serial::DataBits::Eight)
                .parity(tokio_serial::Parity::None)
                .stop_bits(tokio_serial::StopBits::One)
                .flow_control(tokio_serial::FlowControl::None)
                .open_native_async()
                .map_err(std::io::Error::from)
        })
        .await
        .map_err(std::io::Error::other)?
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// Opening a device node that cannot exist must surface an I/O error,
    /// not panic. (Real-device opens are covered by manual hardware tests.)
    #[tokio::test]
    async fn test_opening_a_nonexistent_device_fails_cleanly() {
        let opener = SystemPortOpener;
        let config = SerialPortConfig::new("/dev/ttyDOESNOTEXIST0", 9600);

        let result = opener.open(&config).await;
        assert!(result.is_err());
    }
}
