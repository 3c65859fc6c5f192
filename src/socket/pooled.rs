//! Pool-aware connection wrapper.
//!
//! [`PooledConnection`] behaves like the stream it owns for reads and writes,
//! but closing it hands the stream back to its pool instead of tearing it
//! down. A connection marked unusable is torn down on close and never reused.

use crate::base::neterror::NetError;
use crate::socket::client::StreamSocket;
use crate::socket::pool::ReturnToPool;
use crate::socket::probe;
use parking_lot::RwLock;
use std::fmt;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

/// Shared handle to a connection's usability flag.
///
/// Cloning is cheap. Any clone may mark the connection unusable, including
/// from another task while the connection itself is being closed.
#[derive(Debug, Clone)]
pub struct UsabilityHandle {
    usable: Arc<RwLock<bool>>,
}

impl UsabilityHandle {
    fn new() -> Self {
        Self { usable: Arc::new(RwLock::new(true)) }
    }

    /// Poison the connection so the next close tears it down.
    /// Once unusable, a connection never becomes usable again.
    pub fn mark_unusable(&self) {
        *self.usable.write() = false;
    }

    pub fn is_usable(&self) -> bool {
        *self.usable.read()
    }
}

/// A connection checked out from a pool.
///
/// Dropping the wrapper without calling [`close`](Self::close) runs the same
/// close logic; errors on that path are logged instead of returned.
pub struct PooledConnection<S: StreamSocket> {
    conn: Option<S>,
    usable: UsabilityHandle,
    pool: Weak<dyn ReturnToPool<S>>,
}

impl<S: StreamSocket> PooledConnection<S> {
    /// Wrap a freshly checked-out stream. The pool reference is weak: the
    /// wrapper never keeps its pool alive.
    pub fn new(conn: S, pool: Weak<dyn ReturnToPool<S>>) -> Self {
        Self { conn: Some(conn), usable: UsabilityHandle::new(), pool }
    }

    /// Return the connection to its pool, or tear it down if it was marked
    /// unusable. A usable connection whose pool is gone is torn down as well.
    pub fn close(mut self) -> Result<(), NetError> {
        self.release()
    }

    /// Mark the connection unusable. Idempotent.
    pub fn mark_unusable(&self) {
        self.usable.mark_unusable();
    }

    pub fn is_usable(&self) -> bool {
        self.usable.is_usable()
    }

    /// Get a handle that can poison this connection from elsewhere.
    pub fn usability_handle(&self) -> UsabilityHandle {
        self.usable.clone()
    }

    /// Probe the idle connection for a closed or errored peer.
    /// See [`probe::check_liveness`].
    pub fn check_liveness(&self) -> Result<(), NetError> {
        probe::check_liveness(self)
    }

    /// Get a reference to the inner stream, unless it was detached.
    pub fn get_ref(&self) -> Option<&S> {
        self.conn.as_ref()
    }

    /// Get a mutable reference to the inner stream, unless it was detached.
    pub fn get_mut(&mut self) -> Option<&mut S> {
        self.conn.as_mut()
    }

    /// Take the stream out of pool management entirely.
    /// A later close has nothing to return and succeeds without touching the pool.
    pub fn detach(&mut self) -> Option<S> {
        self.conn.take()
    }

    fn release(&mut self) -> Result<(), NetError> {
        // Held for the whole close so a concurrent mark_unusable lands either
        // before the decision or after the stream is gone.
        let usable = self.usable.usable.read();

        let Some(conn) = self.conn.take() else {
            return Ok(());
        };

        if !*usable {
            return conn.teardown().map_err(NetError::from);
        }

        match self.pool.upgrade() {
            Some(pool) => pool.put(conn),
            None => conn.teardown().map_err(NetError::from),
        }
    }

    fn detached_error() -> io::Error {
        io::Error::new(io::ErrorKind::NotConnected, "pooled connection detached")
    }
}

impl<S: StreamSocket> Drop for PooledConnection<S> {
    fn drop(&mut self) {
        if self.conn.is_none() {
            return;
        }
        if let Err(e) = self.release() {
            tracing::debug!(error = %e, "deferred close of pooled connection failed");
        }
    }
}

impl<S: StreamSocket> fmt::Debug for PooledConnection<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledConnection")
            .field("conn", &self.conn)
            .field("usable", &self.is_usable())
            .field("pool_alive", &(self.pool.strong_count() > 0))
            .finish()
    }
}

impl<S: StreamSocket> AsyncRead for PooledConnection<S> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.conn.as_mut() {
            Some(conn) => Pin::new(conn).poll_read(cx, buf),
            None => Poll::Ready(Err(Self::detached_error())),
        }
    }
}

impl<S: StreamSocket> AsyncWrite for PooledConnection<S> {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.conn.as_mut() {
            Some(conn) => Pin::new(conn).poll_write(cx, buf),
            None => Poll::Ready(Err(Self::detached_error())),
        }
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.conn.as_mut() {
            Some(conn) => Pin::new(conn).poll_flush(cx),
            None => Poll::Ready(Err(Self::detached_error())),
        }
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.conn.as_mut() {
            Some(conn) => Pin::new(conn).poll_shutdown(cx),
            None => Poll::Ready(Err(Self::detached_error())),
        }
    }
}
