use socket2::SockRef;
use std::fmt;
use std::io::{self, ErrorKind};
use std::net::Shutdown;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream};
use tokio::net::TcpStream;
#[cfg(unix)]
use tokio::net::UnixStream;

/// Represents a connected stream that can live in a pool.
/// Mimics net::StreamSocket.
pub trait StreamSocket: AsyncRead + AsyncWrite + Unpin + Send + Sync + fmt::Debug + 'static {
    /// Raw access to the OS socket, if there is one.
    ///
    /// Sockets returned here must be in non-blocking mode. Streams that are
    /// not backed by a system socket keep the default `None`.
    fn sock_ref(&self) -> Option<SockRef<'_>> {
        None
    }

    /// Tear the connection down for good.
    fn teardown(self) -> io::Result<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

/// Shut both directions down through the raw socket.
/// A peer that already went away leaves nothing to shut down.
fn shutdown_socket(sock: SockRef<'_>) -> io::Result<()> {
    match sock.shutdown(Shutdown::Both) {
        Err(ref e) if e.kind() == ErrorKind::NotConnected => Ok(()),
        other => other,
    }
}

impl StreamSocket for TcpStream {
    fn sock_ref(&self) -> Option<SockRef<'_>> {
        Some(SockRef::from(self))
    }

    fn teardown(self) -> io::Result<()> {
        shutdown_socket(SockRef::from(&self))
    }
}

#[cfg(unix)]
impl StreamSocket for UnixStream {
    fn sock_ref(&self) -> Option<SockRef<'_>> {
        Some(SockRef::from(self))
    }

    fn teardown(self) -> io::Result<()> {
        shutdown_socket(SockRef::from(&self))
    }
}

// In-memory pipe: no descriptor to inspect, dropping it closes the peer.
impl StreamSocket for DuplexStream {}

#[derive(Debug)]
pub enum SocketType {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(UnixStream),
}

impl From<TcpStream> for SocketType {
    fn from(stream: TcpStream) -> Self {
        SocketType::Tcp(stream)
    }
}

#[cfg(unix)]
impl From<UnixStream> for SocketType {
    fn from(stream: UnixStream) -> Self {
        SocketType::Unix(stream)
    }
}

impl AsyncRead for SocketType {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut tokio::io::ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            SocketType::Tcp(s) => Pin::new(s).poll_read(cx, buf),
            #[cfg(unix)]
            SocketType::Unix(s) => Pin::new(s).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for SocketType {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            SocketType::Tcp(s) => Pin::new(s).poll_write(cx, buf),
            #[cfg(unix)]
            SocketType::Unix(s) => Pin::new(s).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            SocketType::Tcp(s) => Pin::new(s).poll_flush(cx),
            #[cfg(unix)]
            SocketType::Unix(s) => Pin::new(s).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            SocketType::Tcp(s) => Pin::new(s).poll_shutdown(cx),
            #[cfg(unix)]
            SocketType::Unix(s) => Pin::new(s).poll_shutdown(cx),
        }
    }
}

impl StreamSocket for SocketType {
    fn sock_ref(&self) -> Option<SockRef<'_>> {
        match self {
            SocketType::Tcp(s) => s.sock_ref(),
            #[cfg(unix)]
            SocketType::Unix(s) => s.sock_ref(),
        }
    }

    fn teardown(self) -> io::Result<()> {
        match self {
            SocketType::Tcp(s) => s.teardown(),
            #[cfg(unix)]
            SocketType::Unix(s) => s.teardown(),
        }
    }
}
