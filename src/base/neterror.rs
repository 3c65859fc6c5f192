use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetError {
    // Connection Errors
    #[error("Connection closed (TCP FIN)")]
    ConnectionClosed,
    #[error("Connection reset (TCP RST)")]
    ConnectionReset,
    #[error("Connection refused")]
    ConnectionRefused,
    #[error("Connection aborted")]
    ConnectionAborted,
    #[error("Connection failed")]
    ConnectionFailed,
    #[error("Name not resolved")]
    NameNotResolved,
    #[error("Address invalid")]
    AddressInvalid,
    #[error("Socket not connected")]
    SocketNotConnected,
    #[error("Connection timed out")]
    ConnectionTimedOut,

    // Pool Errors
    #[error("Pool is closed")]
    PoolClosed,
    #[error("Invalid pool settings: {0}")]
    InvalidPoolSettings(&'static str),

    // Liveness Errors
    #[error("Socket closed by remote")]
    SocketRemoteClosed,
    #[error("Data received unexpectedly on idle socket")]
    DataReceivedUnexpectedly,

    /// An OS-level socket error, carried as reported by the system.
    #[error("Socket error: {0}")]
    Io(#[from] io::Error),

    #[error("Unknown error: {0}")]
    Unknown(i32),
}

impl NetError {
    pub fn as_i32(&self) -> i32 {
        match self {
            NetError::ConnectionClosed => -100,
            NetError::ConnectionReset => -101,
            NetError::ConnectionRefused => -102,
            NetError::ConnectionAborted => -103,
            NetError::ConnectionFailed => -104,
            NetError::NameNotResolved => -105,
            NetError::AddressInvalid => -108,
            NetError::SocketNotConnected => -112,
            NetError::ConnectionTimedOut => -118,
            // Edge case errors (custom codes starting at -900)
            NetError::SocketRemoteClosed => -901,
            NetError::DataReceivedUnexpectedly => -902,
            NetError::PoolClosed => -905,
            NetError::InvalidPoolSettings(_) => -906,
            NetError::Io(e) => Self::map_io_error(e).as_i32(),
            NetError::Unknown(code) => *code,
        }
    }

    /// Map an OS error onto the closest fixed error code.
    /// Kinds without a dedicated variant become `ERR_FAILED` (-2).
    fn map_io_error(e: &io::Error) -> NetError {
        match e.kind() {
            io::ErrorKind::ConnectionReset => NetError::ConnectionReset,
            io::ErrorKind::ConnectionRefused => NetError::ConnectionRefused,
            io::ErrorKind::ConnectionAborted => NetError::ConnectionAborted,
            io::ErrorKind::NotConnected => NetError::SocketNotConnected,
            io::ErrorKind::TimedOut => NetError::ConnectionTimedOut,
            io::ErrorKind::AddrNotAvailable => NetError::AddressInvalid,
            io::ErrorKind::UnexpectedEof | io::ErrorKind::BrokenPipe => {
                NetError::ConnectionClosed
            }
            _ => NetError::Unknown(-2),
        }
    }

    /// True when the error means the peer is gone and the connection
    /// must not be handed out again.
    pub fn is_connection_gone(&self) -> bool {
        match self {
            NetError::ConnectionClosed
            | NetError::ConnectionReset
            | NetError::ConnectionAborted
            | NetError::SocketNotConnected
            | NetError::SocketRemoteClosed => true,
            NetError::Io(e) => Self::map_io_error(e).is_connection_gone(),
            _ => false,
        }
    }
}

impl From<i32> for NetError {
    fn from(code: i32) -> Self {
        match code {
            -100 => NetError::ConnectionClosed,
            -101 => NetError::ConnectionReset,
            -102 => NetError::ConnectionRefused,
            -103 => NetError::ConnectionAborted,
            -104 => NetError::ConnectionFailed,
            -105 => NetError::NameNotResolved,
            -108 => NetError::AddressInvalid,
            -112 => NetError::SocketNotConnected,
            -118 => NetError::ConnectionTimedOut,
            -901 => NetError::SocketRemoteClosed,
            -902 => NetError::DataReceivedUnexpectedly,
            -905 => NetError::PoolClosed,
            _ => NetError::Unknown(code),
        }
    }
}
