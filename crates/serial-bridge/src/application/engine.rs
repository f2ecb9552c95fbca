//! Engine: startup, lifecycle control, and drain.
//!
//! The engine owns everything with a lifetime: the port pool, the accept
//! loop task, and the process-wide shutdown signal. There is no ambient
//! global state; callers hold an [`Engine`] value and the spawned tasks hold
//! `Arc`s into it.
//!
//! # Startup ordering
//!
//! 1. Every configured serial port is opened eagerly, in configured order.
//!    Any failure aborts startup with [`StartupError::SerialOpen`]; a
//!    silently shortened pool would break the clients' expectation that N
//!    configured ports serve N connections.
//! 2. The TCP listener is bound ([`StartupError::Bind`] on failure).
//! 3. The accept loop is spawned and the engine handle returned.
//!
//! After startup nothing is fatal any more: session-level I/O errors are
//! contained by the session that owns them.

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_serial::SerialStream;
use tracing::{info, warn};

use serial_core::{BridgeConfig, PooledPort, PortPool, ShutdownController};

use crate::infrastructure::listener::run_listener;
use crate::infrastructure::serial::{PortOpener, SystemPortOpener};

/// Fatal startup failures. Nothing of the engine survives one of these: no
/// partially opened pool, no half-bound listener.
#[derive(Debug, Error)]
pub enum StartupError {
    /// A configured serial port could not be opened.
    #[error("failed to open serial port {path}: {source}")]
    SerialOpen {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The listen address could not be bound.
    #[error("failed to bind TCP listener on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// A running bridge engine.
///
/// Generic over the serial handle type `P` so tests can drive the whole
/// engine with in-memory duplex streams; production code uses
/// [`Engine::start`], which fixes `P` to `tokio_serial::SerialStream`.
pub struct Engine<P> {
    pool: Arc<PortPool<P>>,
    local_addr: SocketAddr,
    shutdown: ShutdownController,
    accept_task: JoinHandle<()>,
}

impl<P> std::fmt::Debug for Engine<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("local_addr", &self.local_addr)
            .field("shutdown", &self.shutdown)
            .finish_non_exhaustive()
    }
}

impl Engine<SerialStream> {
    /// Starts the bridge against real serial hardware.
    ///
    /// # Errors
    ///
    /// Returns [`StartupError`] if any configured port fails to open or the
    /// listen address cannot be bound.
    pub async fn start(config: BridgeConfig) -> Result<Self, StartupError> {
        Self::start_with_opener(config, SystemPortOpener).await
    }
}

impl<P> Engine<P>
where
    P: AsyncRead + AsyncWrite + Send + 'static,
{
    /// Starts the bridge with a caller-supplied port opener. This is the
    /// seam the integration tests use to substitute in-memory serial
    /// devices for real ones.
    ///
    /// # Errors
    ///
    /// Same contract as [`Engine::start`].
    pub async fn start_with_opener<O>(config: BridgeConfig, opener: O) -> Result<Self, StartupError>
    where
        O: PortOpener<Port = P>,
    {
        // Eager open in configured order; the first failure wins and no
        // partial pool is retained.
        let mut ports = Vec::with_capacity(config.ports.len());
        for port_config in &config.ports {
            let port =
                opener
                    .open(port_config)
                    .await
                    .map_err(|source| StartupError::SerialOpen {
                        path: port_config.path.clone(),
                        source,
                    })?;
            info!("opened serial port {port_config}");
            ports.push(PooledPort {
                config: port_config.clone(),
                port,
            });
        }
        let pool = Arc::new(PortPool::new(ports));

        let listener =
            TcpListener::bind(config.listen_addr)
                .await
                .map_err(|source| StartupError::Bind {
                    addr: config.listen_addr,
                    source,
                })?;
        // The actual bound address matters when the config asked for port 0.
        let local_addr = listener.local_addr().map_err(|source| StartupError::Bind {
            addr: config.listen_addr,
            source,
        })?;
        info!(
            "listening on {local_addr}; {} serial port(s) available",
            pool.remaining()
        );

        let (shutdown, shutdown_listener) = ShutdownController::new();
        let accept_task = tokio::spawn(run_listener(
            listener,
            Arc::clone(&pool),
            config.framing,
            config.chunk_size,
            shutdown_listener,
        ));

        Ok(Self {
            pool,
            local_addr,
            shutdown,
            accept_task,
        })
    }

    /// Blocks until the pool is exhausted, the listener has closed, and
    /// every session has reached its terminal state.
    ///
    /// This is the replacement for a busy-wait main loop: the accept task
    /// joins each session before it returns, so awaiting it is the complete
    /// drain condition.
    pub async fn wait_until_drained(self) {
        if let Err(e) = self.accept_task.await {
            warn!("accept loop task failed: {e}");
        }
    }

    /// Requests a forced stop: the listener closes and every active session
    /// drains as if its peer had disconnected. Use [`Self::wait_until_drained`]
    /// afterwards to observe completion.
    pub fn shutdown(&self) {
        self.shutdown.trigger();
    }

    /// A clonable handle that triggers the same forced stop; hand this to a
    /// signal handler task.
    pub fn shutdown_handle(&self) -> ShutdownController {
        self.shutdown.clone()
    }

    /// The address the listener actually bound, for logs and tests.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serial ports not yet matched to a connection. Observability only.
    pub fn remaining_ports(&self) -> usize {
        self.pool.remaining()
    }
}
