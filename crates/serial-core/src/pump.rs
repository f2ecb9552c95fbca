//! One-directional forwarding pumps.
//!
//! A pump is a loop bound to one direction of a session: it reads a chunk
//! from one endpoint and writes it verbatim to the other until the source
//! reports EOF, an I/O error occurs, or the session's shutdown signal fires.
//!
//! # Forwarding discipline
//!
//! - Reads block asynchronously; there is no polling and no read timeout.
//!   Cancellation is handled by `select!`-ing the shutdown listener against
//!   the read, so a parked pump wakes the moment its sibling terminates.
//! - Writes use `write_all` followed by `flush`: a partial write is retried
//!   until the whole chunk is consumed, never silently dropped.
//! - Payload bytes are never interpreted. [`pump_lines`] chunks on `\n` but
//!   forwards the delimiter along with everything else, byte for byte.
//!
//! On the way out a pump flushes and shuts down its writer exactly once,
//! which propagates EOF to the far side of that endpoint.

use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tracing::trace;

use crate::shutdown::ShutdownListener;

/// Why a pump stopped.
#[derive(Debug)]
pub enum PumpOutcome {
    /// The read side returned EOF: the peer closed its end.
    PeerClosed,
    /// The session's shutdown signal fired before the next chunk.
    Cancelled,
    /// A read or write failed. Fatal for this pump only.
    Failed(std::io::Error),
}

impl PumpOutcome {
    /// True when the pump stopped because of an I/O error.
    pub fn is_error(&self) -> bool {
        matches!(self, PumpOutcome::Failed(_))
    }
}

impl std::fmt::Display for PumpOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PumpOutcome::PeerClosed => f.write_str("peer closed"),
            PumpOutcome::Cancelled => f.write_str("cancelled"),
            PumpOutcome::Failed(e) => write!(f, "failed: {e}"),
        }
    }
}

/// Result of one pump run: why it stopped and how much it moved.
#[derive(Debug)]
pub struct PumpReport {
    pub outcome: PumpOutcome,
    pub bytes_forwarded: u64,
}

/// Copies fixed-size chunks from `reader` to `writer` until EOF, error, or
/// shutdown. This is the pump for the network-to-serial direction and the
/// default ([`Framing::Raw`]) serial-to-network pump.
///
/// `label` names the direction in trace logs, e.g. `"tcp->serial"`.
///
/// [`Framing::Raw`]: crate::config::Framing::Raw
pub async fn pump_raw<R, W>(
    label: String,
    mut reader: R,
    mut writer: W,
    chunk_size: usize,
    mut shutdown: ShutdownListener,
) -> PumpReport
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; chunk_size];
    let mut bytes_forwarded = 0u64;

    let outcome = loop {
        let n = tokio::select! {
            _ = shutdown.triggered() => break PumpOutcome::Cancelled,
            read = reader.read(&mut buf) => match read {
                Ok(0) => break PumpOutcome::PeerClosed,
                Ok(n) => n,
                Err(e) => break PumpOutcome::Failed(e),
            },
        };

        if let Err(e) = forward_chunk(&mut writer, &buf[..n]).await {
            break PumpOutcome::Failed(e);
        }
        bytes_forwarded += n as u64;
        trace!("{label}: forwarded {n} bytes ({bytes_forwarded} total)");
    };

    finish_writer(&mut writer).await;
    PumpReport {
        outcome,
        bytes_forwarded,
    }
}

/// Copies newline-delimited chunks from `reader` to `writer`. The variant
/// pump for the serial-to-network direction under [`Framing::Line`].
///
/// Bytes are accumulated until a `\n` arrives and then forwarded in one
/// write, delimiter included. A trailing chunk without a delimiter is still
/// forwarded when the source reaches EOF, so no byte is ever withheld
/// permanently once the line ends or the stream closes.
///
/// [`Framing::Line`]: crate::config::Framing::Line
pub async fn pump_lines<R, W>(
    label: String,
    reader: R,
    mut writer: W,
    chunk_size: usize,
    mut shutdown: ShutdownListener,
) -> PumpReport
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut reader = BufReader::with_capacity(chunk_size, reader);
    let mut line = Vec::with_capacity(chunk_size);
    let mut bytes_forwarded = 0u64;

    let outcome = loop {
        line.clear();
        let n = tokio::select! {
            _ = shutdown.triggered() => break PumpOutcome::Cancelled,
            read = reader.read_until(b'\n', &mut line) => match read {
                Ok(0) => break PumpOutcome::PeerClosed,
                Ok(n) => n,
                Err(e) => break PumpOutcome::Failed(e),
            },
        };

        if let Err(e) = forward_chunk(&mut writer, &line[..n]).await {
            break PumpOutcome::Failed(e);
        }
        bytes_forwarded += n as u64;
        trace!("{label}: forwarded {n}-byte line ({bytes_forwarded} total)");
    };

    finish_writer(&mut writer).await;
    PumpReport {
        outcome,
        bytes_forwarded,
    }
}

/// Writes one chunk completely: `write_all` loops over partial writes, and
/// the flush keeps latency at one chunk rather than one buffer.
async fn forward_chunk<W: AsyncWrite + Unpin>(
    writer: &mut W,
    chunk: &[u8],
) -> std::io::Result<()> {
    writer.write_all(chunk).await?;
    writer.flush().await
}

/// Flushes and shuts down the writer on pump exit. Best effort: the pump's
/// outcome is already decided, and the endpoint may be gone.
async fn finish_writer<W: AsyncWrite + Unpin>(writer: &mut W) {
    let _ = writer.shutdown().await;
}

// ── Tests ─────────────────────────────────────────────────────────────────────
