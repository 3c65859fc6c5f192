//! # netpool
//!
//! Pooled network connections for Rust.
//!
//! A [`PooledConnection`] reads and writes like the stream it wraps, but
//! closing it puts the stream back into its pool. Marking it unusable first
//! makes close tear the stream down instead, so a connection that saw a
//! protocol error is never handed out again.
//!
//! Before reusing an idle connection the pool runs a liveness probe: a
//! non-blocking one-byte peek on the raw socket that tells a healthy idle
//! peer apart from one that closed, reset, or sent unsolicited data.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use netpool::{ChannelPool, ConnectJob, PoolConfig};
//! use tokio::io::AsyncWriteExt;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), netpool::NetError> {
//!     let dial = ConnectJob::factory("example.com", 80);
//!     let pool = ChannelPool::new(PoolConfig::default(), dial).await?;
//!
//!     let mut conn = pool.get().await?;
//!     if conn.write_all(b"PING\r\n").await.is_err() {
//!         conn.mark_unusable();
//!     }
//!     conn.close()?; // back to the pool, or torn down if unusable
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`base`] - Error definitions
//! - [`socket`] - Pooled connections, liveness probing, and the pool itself

pub mod base;
pub mod socket;

pub use base::neterror::NetError;
pub use socket::client::{SocketType, StreamSocket};
pub use socket::connectjob::ConnectJob;
pub use socket::pool::{ChannelPool, DialFn, PoolConfig, ReturnToPool};
pub use socket::pooled::{PooledConnection, UsabilityHandle};
pub use socket::probe::check_liveness;
