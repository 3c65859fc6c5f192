//! Non-blocking liveness probe for idle connections.
//!
//! Peeks one byte through the raw socket without waiting for readiness.
//! `MSG_PEEK` leaves any pending byte in the kernel buffer, so a probe that
//! finds data does not steal it from the next reader.
//!
//! Only probe connections nobody else is reading from, e.g. while they sit in
//! a pool's idle set.

use crate::base::neterror::NetError;
use crate::socket::client::StreamSocket;
use crate::socket::pooled::PooledConnection;
use socket2::Socket;
use std::io::ErrorKind;
use std::mem::MaybeUninit;

/// Check whether the peer of an idle pooled connection is still there.
///
/// - `Ok(())`: no data pending, socket healthy. Also returned for streams
///   without a raw socket, which cannot be inspected.
/// - [`NetError::SocketNotConnected`]: the stream was detached from the wrapper.
/// - [`NetError::SocketRemoteClosed`]: the peer closed the connection.
/// - [`NetError::DataReceivedUnexpectedly`]: bytes are waiting on a connection
///   that should be idle.
/// - [`NetError::Io`]: any other socket error, as reported by the OS.
pub fn check_liveness<S: StreamSocket>(conn: &PooledConnection<S>) -> Result<(), NetError> {
    let socket = conn.get_ref().ok_or(NetError::SocketNotConnected)?;
    probe_stream(socket)
}

/// Probe a bare stream, as held in a pool's idle set.
pub fn probe_stream<S: StreamSocket>(socket: &S) -> Result<(), NetError> {
    match socket.sock_ref() {
        Some(sock) => probe_socket(&sock),
        None => Ok(()),
    }
}

fn probe_socket(sock: &Socket) -> Result<(), NetError> {
    let mut buf = [MaybeUninit::<u8>::uninit(); 1];
    loop {
        match sock.peek(&mut buf) {
            Ok(0) => return Err(NetError::SocketRemoteClosed),
            Ok(_) => return Err(NetError::DataReceivedUnexpectedly),
            Err(ref e) if e.kind() == ErrorKind::WouldBlock => return Ok(()),
            Err(ref e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(NetError::Io(e)),
        }
    }
}
