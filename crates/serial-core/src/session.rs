//! Session: one network connection paired with one serial port.
//!
//! A session owns both endpoints exclusively and runs the two forwarding
//! pumps concurrently, one tokio task each. Termination is asymmetric by
//! design: whichever pump stops first is authoritative, and the session
//! unconditionally drives the sibling to stop as well. A dead network peer
//! must free the serial line; a serial error must drop the client.
//!
//! # State machine
//!
//! ```text
//! Created ── pumps spawned ──▶ Running ── first pump stops ──▶ Draining
//!                                             (or engine shutdown)  │
//!                                   sibling observes the signal     │
//! Closed ◀── both pumps stopped, both endpoints shut down ──────────┘
//! ```
//!
//! `Closed` is terminal. A session never re-enters `Running` after any pump
//! stops, and the serial handle is dropped (released, never re-pooled) when
//! the session ends.

use std::fmt;

use tokio::task::JoinError;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Framing;
use crate::pool::PooledPort;
use crate::pump::{pump_lines, pump_raw, PumpOutcome, PumpReport};
use crate::shutdown::{ShutdownController, ShutdownListener};

/// Unique identifier for one session, used to correlate log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generates a fresh random session ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Lifecycle states of a session. Transitions are strictly forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Endpoints paired, pumps not yet spawned.
    Created,
    /// Both pumps running.
    Running,
    /// One pump stopped; shutdown requested on the sibling.
    Draining,
    /// Both pumps stopped and both endpoints closed. Terminal.
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Created => "created",
            SessionState::Running => "running",
            SessionState::Draining => "draining",
            SessionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Final report of a completed session.
#[derive(Debug)]
pub struct SessionSummary {
    pub id: SessionId,
    /// Device path of the serial port this session consumed.
    pub port_path: String,
    /// Always [`SessionState::Closed`]; carried so callers need no implicit
    /// knowledge of the terminal state.
    pub state: SessionState,
    /// Network-to-serial pump result.
    pub net_to_serial: PumpReport,
    /// Serial-to-network pump result.
    pub serial_to_net: PumpReport,
}

impl SessionSummary {
    /// True when either pump stopped because of an I/O error (as opposed to
    /// a peer close or a requested shutdown).
    pub fn had_error(&self) -> bool {
        self.net_to_serial.outcome.is_error() || self.serial_to_net.outcome.is_error()
    }
}

/// Runs one complete session: both pumps, shutdown coordination, and
/// endpoint teardown. Resolves once the session reaches `Closed`.
///
/// The network-to-serial direction always uses raw chunked reads; `framing`
/// selects the serial-to-network chunking policy.
///
/// `engine_shutdown` is the process-wide signal: when the engine is asked to
/// stop, every session drains exactly as if one of its pumps had terminated.
///
/// Teardown happens exactly once per endpoint: each pump flushes and shuts
/// down the write half it owns on exit, and the read halves are dropped when
/// the pump tasks finish, closing both the socket and the serial handle.
pub async fn run_session<S, P>(
    id: SessionId,
    socket: S,
    port: PooledPort<P>,
    framing: Framing,
    chunk_size: usize,
    mut engine_shutdown: ShutdownListener,
) -> SessionSummary
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Send + 'static,
    P: tokio::io::AsyncRead + tokio::io::AsyncWrite + Send + 'static,
{
    let PooledPort { config, port: serial } = port;
    let port_path = config.path.clone();
    let mut state = SessionState::Created;
    debug!("session {id}: {state} for {config}");

    let (net_reader, net_writer) = tokio::io::split(socket);
    let (serial_reader, serial_writer) = tokio::io::split(serial);

    // Session-local shutdown signal: triggered by the first pump to stop or
    // by the engine-wide signal, observed by both pumps at loop boundaries.
    let (cancel, cancel_listener) = ShutdownController::new();

    let mut to_serial = tokio::spawn(pump_raw(
        format!("session {id}: tcp->serial"),
        net_reader,
        serial_writer,
        chunk_size,
        cancel_listener.clone(),
    ));

    let mut to_net = tokio::spawn({
        let label = format!("session {id}: serial->tcp");
        async move {
            match framing {
                Framing::Raw => {
                    pump_raw(label, serial_reader, net_writer, chunk_size, cancel_listener).await
                }
                Framing::Line => {
                    pump_lines(label, serial_reader, net_writer, chunk_size, cancel_listener).await
                }
            }
        }
    });

    state = SessionState::Running;
    debug!("session {id}: {state}");

    // First termination wins; it is authoritative for the whole session.
    let mut net_to_serial: Option<PumpReport> = None;
    let mut serial_to_net: Option<PumpReport> = None;
    tokio::select! {
        res = &mut to_serial => net_to_serial = Some(join_pump(res)),
        res = &mut to_net => serial_to_net = Some(join_pump(res)),
        _ = engine_shutdown.triggered() => debug!("session {id}: engine shutdown requested"),
    }

    state = SessionState::Draining;
    debug!("session {id}: {state}");
    cancel.trigger();

    let net_to_serial = match net_to_serial {
        Some(report) => report,
        None => join_pump(to_serial.await),
    };
    let serial_to_net = match serial_to_net {
        Some(report) => report,
        None => join_pump(to_net.await),
    };

    state = SessionState::Closed;
    if net_to_serial.outcome.is_error() || serial_to_net.outcome.is_error() {
        warn!(
            "session {id}: {state} with error; {port_path} released \
             (tcp->serial {}, serial->tcp {})",
            net_to_serial.outcome, serial_to_net.outcome,
        );
    } else {
        info!(
            "session {id}: {state}; {port_path} released \
             ({} bytes to serial, {} bytes to client)",
            net_to_serial.bytes_forwarded, serial_to_net.bytes_forwarded,
        );
    }

    SessionSummary {
        id,
        port_path,
        state,
        net_to_serial,
        serial_to_net,
    }
}

/// Converts a pump task join result into a report. A panicked pump task is
/// folded into a failed outcome so the session still closes cleanly.
fn join_pump(result: Result<PumpReport, JoinError>) -> PumpReport {
    result.unwrap_or_else(|e| PumpReport {
        outcome: PumpOutcome::Failed(std::io::Error::other(e)),
        bytes_forwarded: 0,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SerialPortConfig;
    use std::time::Duration;
    use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt, DuplexStream};
    use tokio::task::JoinHandle;
    use tokio::time::timeout;

    /// Spawns a session over in-memory streams and returns the far ends:
    /// `client` plays the TCP peer, `device` plays the serial device.
    fn spawn_session(
        framing: Framing,
    ) -> (
        DuplexStream,
        DuplexStream,
        JoinHandle<SessionSummary>,
        ShutdownController,
    ) {
        let (client, socket) = duplex(256);
        let (device, serial) = duplex(256);
        let (engine, engine_listener) = ShutdownController::new();

        let handle = tokio::spawn(run_session(
            SessionId::new(),
            socket,
            PooledPort {
                config: SerialPortConfig::new("/dev/ttyTEST", 9600),
                port: serial,
            },
            framing,
            4096,
            engine_listener,
        ));

        (client, device, handle, engine)
    }

    #[tokio::test]
    async fn test_bytes_flow_client_to_device_verbatim() {
        let (mut client, mut device, handle, _engine) = spawn_session(Framing::Raw);

        client.write_all(b"hello").await.unwrap();

        let mut buf = [0u8; 5];
        timeout(Duration::from_secs(1), device.read_exact(&mut buf))
            .await
            .expect("device must receive the client bytes")
            .unwrap();
        assert_eq!(&buf, b"hello");

        drop(client);
        timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_bytes_flow_device_to_client_verbatim() {
        let (mut client, mut device, handle, _engine) = spawn_session(Framing::Raw);

        // Raw framing must deliver delimiter-free binary data immediately.
        device.write_all(&[0x01, 0x02, 0xFE, 0xFF]).await.unwrap();

        let mut buf = [0u8; 4];
        timeout(Duration::from_secs(1), client.read_exact(&mut buf))
            .await
            .expect("client must receive the device bytes")
            .unwrap();
        assert_eq!(buf, [0x01, 0x02, 0xFE, 0xFF]);

        drop(client);
        timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_client_close_drives_session_closed_with_silent_device() {
        // The device never produces a byte, so the serial pump is parked on
        // a read that will never complete. Closing the client side must
        // still close the whole session in bounded time.
        let (client, _device, handle, _engine) = spawn_session(Framing::Raw);

        drop(client);

        let summary = timeout(Duration::from_secs(1), handle)
            .await
            .expect("session must close in bounded time")
            .unwrap();
        assert_eq!(summary.state, SessionState::Closed);
        assert!(matches!(
            summary.net_to_serial.outcome,
            PumpOutcome::PeerClosed
        ));
        assert!(!summary.had_error());
    }

    #[tokio::test]
    async fn test_device_eof_drops_the_client() {
        let (mut client, device, handle, _engine) = spawn_session(Framing::Raw);

        drop(device);

        // The session tears the socket down, so the client reads EOF.
        let mut sink = Vec::new();
        let n = timeout(Duration::from_secs(1), client.read_to_end(&mut sink))
            .await
            .expect("client must observe the close")
            .unwrap();
        assert_eq!(n, 0);

        let summary = timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
        assert_eq!(summary.state, SessionState::Closed);
    }

    #[tokio::test]
    async fn test_engine_shutdown_closes_an_idle_session() {
        let (_client, _device, handle, engine) = spawn_session(Framing::Raw);

        engine.trigger();

        let summary = timeout(Duration::from_secs(1), handle)
            .await
            .expect("forced shutdown must close the session")
            .unwrap();
        assert_eq!(summary.state, SessionState::Closed);
        assert!(matches!(
            summary.net_to_serial.outcome,
            PumpOutcome::Cancelled
        ));
        assert!(matches!(
            summary.serial_to_net.outcome,
            PumpOutcome::Cancelled
        ));
    }

    #[tokio::test]
    async fn test_summary_counts_bytes_per_direction() {
        let (mut client, mut device, handle, _engine) = spawn_session(Framing::Raw);

        client.write_all(b"12345678").await.unwrap();
        let mut buf = [0u8; 8];
        device.read_exact(&mut buf).await.unwrap();

        device.write_all(b"ok").await.unwrap();
        let mut buf = [0u8; 2];
        client.read_exact(&mut buf).await.unwrap();

        drop(client);
        let summary = timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
        assert_eq!(summary.net_to_serial.bytes_forwarded, 8);
        assert_eq!(summary.serial_to_net.bytes_forwarded, 2);
        assert_eq!(summary.port_path, "/dev/ttyTEST");
    }

    #[tokio::test]
    async fn test_line_framing_forwards_complete_lines() {
        let (mut client, mut device, handle, _engine) = spawn_session(Framing::Line);

        device.write_all(b"reading: 42\n").await.unwrap();

        let mut buf = [0u8; 12];
        timeout(Duration::from_secs(1), client.read_exact(&mut buf))
            .await
            .expect("line must be forwarded once the delimiter arrives")
            .unwrap();
        assert_eq!(&buf, b"reading: 42\n");

        drop(client);
        timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
    }
}
