//! Socket and connection management.
//!
//! Provides pooled connections mirroring Chromium's `net/socket/`:
//! - [`pooled`]: Connection wrapper that returns to its pool on close
//! - [`probe`]: Non-blocking liveness check for idle connections
//! - [`pool`]: Bounded idle pool the wrapper returns into
//! - [`connectjob`]: DNS → TCP connection flow used as the pool's dialer
//! - [`client`]: Stream abstraction over TCP and Unix sockets

pub mod client;
pub mod connectjob;
pub mod pool;
pub mod pooled;
pub mod probe;
