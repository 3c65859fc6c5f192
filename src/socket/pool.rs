use crate::base::neterror::NetError;
use crate::socket::client::StreamSocket;
use crate::socket::pooled::PooledConnection;
use crate::socket::probe;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Dials a new connection for the pool.
pub type DialFn<S> = Arc<dyn Fn() -> BoxFuture<'static, Result<S, NetError>> + Send + Sync>;

/// What a [`PooledConnection`] needs from its pool: a way back in.
///
/// Called from `close` and from `Drop`, so implementations must not block
/// indefinitely.
pub trait ReturnToPool<S>: Send + Sync {
    fn put(&self, conn: S) -> Result<(), NetError>;
}

/// Pool sizing and idle policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Connections dialed up front by [`ChannelPool::new`].
    pub initial_capacity: usize,
    /// Upper bound on idle connections kept for reuse.
    pub max_idle: usize,
    /// Idle connections older than this are evicted. `None` keeps them forever.
    pub idle_timeout: Option<Duration>,
    /// Period of the background cleanup task.
    pub cleanup_interval: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 0,
            max_idle: 6,
            idle_timeout: Some(Duration::from_secs(300)), // 5 minutes
            cleanup_interval: Duration::from_secs(60),
        }
    }
}

impl PoolConfig {
    pub fn with_initial_capacity(mut self, initial_capacity: usize) -> Self {
        self.initial_capacity = initial_capacity;
        self
    }

    pub fn with_max_idle(mut self, max_idle: usize) -> Self {
        self.max_idle = max_idle;
        self
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Option<Duration>) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    pub fn with_cleanup_interval(mut self, cleanup_interval: Duration) -> Self {
        self.cleanup_interval = cleanup_interval;
        self
    }

    pub fn validate(&self) -> Result<(), NetError> {
        if self.max_idle == 0 {
            return Err(NetError::InvalidPoolSettings("max_idle must be positive"));
        }
        if self.initial_capacity > self.max_idle {
            return Err(NetError::InvalidPoolSettings("initial_capacity exceeds max_idle"));
        }
        if self.cleanup_interval.is_zero() {
            return Err(NetError::InvalidPoolSettings("cleanup_interval must be positive"));
        }
        Ok(())
    }
}

/// Idle socket with metadata for timeout tracking.
struct IdleSocket<S> {
    socket: S,
    /// When this socket was returned to the pool
    start_time: Instant,
}

struct PoolState<S> {
    idle: VecDeque<IdleSocket<S>>,
    closed: bool,
}

/// A bounded set of idle connections to a single destination.
///
/// Checked-out connections are not counted; the pool only bounds how many it
/// keeps around for reuse.
pub struct ChannelPool<S: StreamSocket> {
    config: PoolConfig,
    factory: DialFn<S>,
    state: Mutex<PoolState<S>>,
}

impl<S: StreamSocket> std::fmt::Debug for ChannelPool<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ChannelPool")
            .field("config", &self.config)
            .field("idle", &state.idle.len())
            .field("closed", &state.closed)
            .finish()
    }
}

impl<S: StreamSocket> ChannelPool<S> {
    /// Create a pool and dial `initial_capacity` connections into it.
    /// If any dial fails the pool is closed and the error returned.
    pub async fn new(config: PoolConfig, factory: DialFn<S>) -> Result<Arc<Self>, NetError> {
        config.validate()?;

        let initial = config.initial_capacity;
        let pool = Arc::new(Self {
            config,
            factory,
            state: Mutex::new(PoolState { idle: VecDeque::with_capacity(initial), closed: false }),
        });

        for _ in 0..initial {
            match (pool.factory)().await {
                Ok(socket) => pool.push_idle(socket),
                Err(e) => {
                    tracing::debug!(error = %e, "initial dial failed, closing pool");
                    pool.close();
                    return Err(e);
                }
            }
        }

        Ok(pool)
    }

    /// Check out a connection: the oldest live idle one, or a freshly dialed one.
    pub async fn get(self: &Arc<Self>) -> Result<PooledConnection<S>, NetError> {
        loop {
            let next = {
                let mut state = self.state.lock();
                if state.closed {
                    return Err(NetError::PoolClosed);
                }
                state.idle.pop_front()
            };

            let Some(idle) = next else {
                break;
            };

            if self.is_expired(&idle) {
                tracing::debug!("evicting expired idle connection");
                Self::discard(idle.socket);
                continue;
            }

            match probe::probe_stream(&idle.socket) {
                Ok(()) => return Ok(self.wrap(idle.socket)),
                Err(e) => {
                    tracing::debug!(
                        error = %e,
                        peer_gone = e.is_connection_gone(),
                        "evicting stale idle connection"
                    );
                    Self::discard(idle.socket);
                }
            }
        }

        let socket = (self.factory)().await?;

        // The pool may have been closed while dialing.
        if self.is_closed() {
            Self::discard(socket);
            return Err(NetError::PoolClosed);
        }

        Ok(self.wrap(socket))
    }

    /// Close the pool and tear down every idle connection. Idempotent.
    ///
    /// Connections still checked out are torn down when they are returned.
    pub fn close(&self) {
        let drained = {
            let mut state = self.state.lock();
            state.closed = true;
            std::mem::take(&mut state.idle)
        };

        for idle in drained {
            Self::discard(idle.socket);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Get idle connection count.
    pub fn idle_count(&self) -> usize {
        self.state.lock().idle.len()
    }

    /// Evict idle connections that expired or fail the liveness probe.
    /// Returns how many were evicted.
    pub fn cleanup_idle(&self) -> usize {
        let evicted: Vec<S> = {
            let mut state = self.state.lock();
            let (kept, evicted): (VecDeque<_>, VecDeque<_>) = std::mem::take(&mut state.idle)
                .into_iter()
                .partition(|idle| {
                    !self.is_expired(idle) && probe::probe_stream(&idle.socket).is_ok()
                });
            state.idle = kept;
            evicted.into_iter().map(|idle| idle.socket).collect()
        };

        let count = evicted.len();
        for socket in evicted {
            Self::discard(socket);
        }
        if count > 0 {
            tracing::debug!(count, "evicted idle connections");
        }
        count
    }

    /// Start a background task that periodically runs [`cleanup_idle`](Self::cleanup_idle).
    /// The task ends once the pool is closed or dropped.
    pub fn start_cleanup_task(self: &Arc<Self>) -> JoinHandle<()> {
        let interval = self.config.cleanup_interval;
        let pool = Arc::downgrade(self);

        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                let Some(pool) = pool.upgrade() else {
                    break;
                };
                if pool.is_closed() {
                    break;
                }
                pool.cleanup_idle();
            }
        })
    }

    fn wrap(self: &Arc<Self>, socket: S) -> PooledConnection<S> {
        let pool = Arc::downgrade(self);
        let pool: Weak<dyn ReturnToPool<S>> = pool;
        PooledConnection::new(socket, pool)
    }

    fn push_idle(&self, socket: S) {
        self.state.lock().idle.push_back(IdleSocket { socket, start_time: Instant::now() });
    }

    fn is_expired(&self, idle: &IdleSocket<S>) -> bool {
        self.config.idle_timeout.is_some_and(|timeout| idle.start_time.elapsed() >= timeout)
    }

    fn discard(socket: S) {
        if let Err(e) = socket.teardown() {
            tracing::debug!(error = %e, "teardown of discarded connection failed");
        }
    }
}

impl<S: StreamSocket> ReturnToPool<S> for ChannelPool<S> {
    /// Put a connection back into the idle set. A closed or full pool tears
    /// the connection down instead and returns the teardown result.
    fn put(&self, socket: S) -> Result<(), NetError> {
        let rejected = {
            let mut state = self.state.lock();
            if state.closed || state.idle.len() >= self.config.max_idle {
                Some(socket)
            } else {
                state.idle.push_back(IdleSocket { socket, start_time: Instant::now() });
                None
            }
        };

        match rejected {
            Some(socket) => socket.teardown().map_err(NetError::from),
            None => Ok(()),
        }
    }
}
