//! First-come first-served pool of opened serial ports.
//!
//! The pool is built once at startup from the ordered, already-opened port
//! handles and only ever shrinks. [`PortPool::take`] removes and returns the
//! head of the queue atomically; it is the single synchronization point
//! shared across sessions. A taken handle is owned exclusively by its
//! session and is never returned to the pool: each port is consumed exactly
//! once for the process lifetime.
//!
//! The pool is generic over the handle type so the engine can be driven with
//! `tokio_serial::SerialStream` in production and `tokio::io::DuplexStream`
//! in tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use thiserror::Error;

use crate::config::SerialPortConfig;

/// Returned by [`PortPool::take`] when every port has been handed out.
///
/// Not an error in the accept path: the listener treats it as the signal to
/// refuse the surplus connection and stop accepting.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("no serial ports left in the pool")]
pub struct PoolEmpty;

/// One opened serial port together with the config it was opened from.
///
/// Exclusively owned by at most one session once taken from the pool.
#[derive(Debug)]
pub struct PooledPort<P> {
    /// The configuration this handle was opened with.
    pub config: SerialPortConfig,
    /// The open handle itself.
    pub port: P,
}

/// Ordered pool of serial port handles awaiting assignment.
pub struct PortPool<P> {
    // VecDeque keeps the configured order; the head is the next handle out.
    inner: Mutex<VecDeque<PooledPort<P>>>,
}

impl<P> PortPool<P> {
    /// Builds the pool from already-opened handles, preserving their order.
    pub fn new(ports: impl IntoIterator<Item = PooledPort<P>>) -> Self {
        Self {
            inner: Mutex::new(ports.into_iter().collect()),
        }
    }

    /// Atomically removes and returns the head of the pool.
    ///
    /// No two callers can receive the same handle: the whole operation is a
    /// single critical section with no await point inside.
    ///
    /// # Errors
    ///
    /// Returns [`PoolEmpty`] once every handle has been handed out.
    pub fn take(&self) -> Result<PooledPort<P>, PoolEmpty> {
        self.lock().pop_front().ok_or(PoolEmpty)
    }

    /// Number of handles still waiting in the pool. Observability only:
    /// control decisions use the success or failure of [`PortPool::take`].
    pub fn remaining(&self) -> usize {
        self.lock().len()
    }

    /// True once the pool has been fully consumed.
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    // A poisoned lock only means another taker panicked; the queue itself
    // is still consistent, so recover the guard instead of propagating.
    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<PooledPort<P>>> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
