//! TCP accept loop and connection-to-port matching.
//!
//! The listener accepts connections only while the port pool still has
//! handles. Each accepted connection attempts a `take()`; on success a
//! session task is spawned, on [`PoolEmpty`] (the accept/exhaustion race)
//! the surplus connection is closed immediately without error escalation.
//! Once the pool is exhausted the listening socket is dropped, no further
//! connections are accepted, and the loop joins every outstanding session
//! before returning. Awaiting the accept task is therefore the complete
//! drain condition.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use serial_core::{
    run_session, Framing, PoolEmpty, PortPool, SessionId, SessionSummary, ShutdownListener,
};

/// Runs the accept loop to pool exhaustion (or forced shutdown), then joins
/// every session. Spawned once by the engine at startup.
pub(crate) async fn run_listener<P>(
    listener: TcpListener,
    pool: Arc<PortPool<P>>,
    framing: Framing,
    chunk_size: usize,
    shutdown: ShutdownListener,
) where
    P: AsyncRead + AsyncWrite + Send + 'static,
{
    let mut sessions: JoinSet<SessionSummary> = JoinSet::new();
    let mut accept_shutdown = shutdown.clone();

    loop {
        if pool.is_empty() {
            info!("serial port pool exhausted; closing listener");
            break;
        }

        tokio::select! {
            _ = accept_shutdown.triggered() => {
                info!("shutdown requested; closing listener");
                break;
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => match pool.take() {
                    Ok(port) => {
                        let id = SessionId::new();
                        info!(
                            "client {peer} connected; matched to {} as session {id} \
                             ({} port(s) remaining)",
                            port.config.path,
                            pool.remaining(),
                        );
                        sessions.spawn(run_session(
                            id,
                            stream,
                            port,
                            framing,
                            chunk_size,
                            shutdown.clone(),
                        ));
                    }
                    Err(PoolEmpty) => {
                        // Accept raced with exhaustion; refuse and move on.
                        info!("client {peer} refused: no serial port available");
                        drop(stream);
                    }
                },
                Err(e) => {
                    // Transient accept failures (e.g. fd exhaustion) must not
                    // take the whole bridge down.
                    error!("accept error: {e}");
                }
            }
        }
    }

    drop(listener);

    let active = sessions.len();
    if active > 0 {
        info!("waiting for {active} active session(s) to close");
    }
    while let Some(joined) = sessions.join_next().await {
        match joined {
            Ok(summary) => debug!(
                "session {} finished; {} is released",
                summary.id, summary.port_path
            ),
            Err(e) => warn!("session task failed: {e}"),
        }
    }
    info!("all sessions closed; bridge drained");
}
