use crate::base::neterror::NetError;
use crate::socket::client::SocketType;
use crate::socket::pool::DialFn;
use futures::FutureExt;
use std::sync::Arc;
use tokio::net::TcpStream;

/// Manages the connection process: DNS -> TCP.
/// Roughly equivalent to net::ConnectJob.
pub struct ConnectJob;

impl ConnectJob {
    pub async fn connect(host: &str, port: u16) -> Result<SocketType, NetError> {
        // 1. DNS Resolution
        let addr_str = format!("{}:{}", host, port);
        let addrs = tokio::net::lookup_host(&addr_str).await.map_err(|e| {
            tracing::debug!(host = %host, error = %e, "resolution failed");
            NetError::NameNotResolved
        })?;

        // 2. TCP Connect, first address that answers wins
        let mut attempted = false;
        for addr in addrs {
            attempted = true;
            match TcpStream::connect(addr).await {
                Ok(stream) => {
                    tracing::debug!(%addr, "connected");
                    return Ok(SocketType::Tcp(stream));
                }
                Err(e) => tracing::debug!(%addr, error = %e, "connect attempt failed"),
            }
        }

        if attempted {
            Err(NetError::ConnectionFailed)
        } else {
            Err(NetError::NameNotResolved)
        }
    }

    #[cfg(unix)]
    pub async fn connect_unix(path: impl AsRef<std::path::Path>) -> Result<SocketType, NetError> {
        let path = path.as_ref();
        tokio::net::UnixStream::connect(path).await.map(SocketType::Unix).map_err(|e| {
            tracing::debug!(path = %path.display(), error = %e, "unix connect failed");
            NetError::ConnectionFailed
        })
    }

    /// Dial function for a [`ChannelPool`](crate::socket::pool::ChannelPool)
    /// connecting to `host:port`.
    pub fn factory(host: impl Into<String>, port: u16) -> DialFn<SocketType> {
        let host: Arc<str> = Arc::from(host.into());
        Arc::new(move || {
            let host = Arc::clone(&host);
            async move { Self::connect(&host, port).await }.boxed()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_connect_loopback() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let socket = ConnectJob::connect("127.0.0.1", port).await.unwrap();
        assert!(matches!(socket, SocketType::Tcp(_)));
    }

    #[tokio::test]
    async fn test_connect_refused() {
        // Bind then drop to get a port nobody listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let result = ConnectJob::connect("127.0.0.1", port).await;
        assert!(matches!(result, Err(NetError::ConnectionFailed)));
    }

    #[tokio::test]
    async fn test_factory_dials() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let dial = ConnectJob::factory("127.0.0.1", port);
        assert!(dial().await.is_ok());
        assert!(dial().await.is_ok());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_connect_unix_missing_path() {
        let result = ConnectJob::connect_unix("/nonexistent/netpool.sock").await;
        assert!(matches!(result, Err(NetError::ConnectionFailed)));
    }
}
