use netpool::{ChannelPool, ConnectJob, NetError, PoolConfig, SocketType};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

/// What the test server does with each accepted connection.
#[derive(Clone, Copy)]
enum ServerMode {
    /// Keep the connection open and idle.
    Hold,
    /// Close the connection right away.
    Hangup,
    /// Send one unsolicited byte, then stay open.
    Chatter,
}

struct TestServer {
    port: u16,
    accepts: Arc<AtomicUsize>,
    accepted: mpsc::UnboundedReceiver<TcpStream>,
}

async fn start_server(mode: ServerMode) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let accepts = Arc::new(AtomicUsize::new(0));
    let (tx, rx) = mpsc::unbounded_channel();

    let counter = accepts.clone();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            match mode {
                ServerMode::Hold => {}
                ServerMode::Hangup => {
                    drop(socket);
                    continue;
                }
                ServerMode::Chatter => {
                    let _ = socket.write_all(b"!").await;
                }
            }
            let _ = tx.send(socket);
        }
    });

    TestServer { port, accepts, accepted: rx }
}

async fn pool_for(server: &TestServer) -> Arc<ChannelPool<SocketType>> {
    ChannelPool::new(PoolConfig::default(), ConnectJob::factory("127.0.0.1", server.port))
        .await
        .unwrap()
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

#[tokio::test]
async fn test_closed_connection_is_reused() {
    let server = start_server(ServerMode::Hold).await;
    let pool = pool_for(&server).await;

    let conn = pool.get().await.unwrap();
    conn.close().unwrap();
    assert_eq!(pool.idle_count(), 1);

    let conn = pool.get().await.unwrap();
    assert!(conn.check_liveness().is_ok());
    conn.close().unwrap();

    settle().await;
    assert_eq!(server.accepts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_io_passes_through_wrapper() {
    let mut server = start_server(ServerMode::Hold).await;
    let pool = pool_for(&server).await;

    let mut conn = pool.get().await.unwrap();
    let mut remote = server.accepted.recv().await.unwrap();

    conn.write_all(b"hello").await.unwrap();
    let mut buf = [0u8; 5];
    remote.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"hello");

    remote.write_all(b"world").await.unwrap();
    conn.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"world");

    conn.close().unwrap();
    assert_eq!(pool.idle_count(), 1);
}

#[tokio::test]
async fn test_unusable_connection_is_torn_down() {
    let mut server = start_server(ServerMode::Hold).await;
    let pool = pool_for(&server).await;

    let conn = pool.get().await.unwrap();
    let mut remote = server.accepted.recv().await.unwrap();

    conn.mark_unusable();
    conn.close().unwrap();
    assert_eq!(pool.idle_count(), 0);

    // Teardown reaches the peer as end-of-stream.
    let mut buf = [0u8; 1];
    let n = remote.read(&mut buf).await.unwrap();
    assert_eq!(n, 0);

    let _conn = pool.get().await.unwrap();
    settle().await;
    assert_eq!(server.accepts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_peer_closed_idle_connection_is_evicted() {
    let server = start_server(ServerMode::Hangup).await;
    let pool = pool_for(&server).await;

    let conn = pool.get().await.unwrap();
    settle().await;
    assert!(matches!(conn.check_liveness(), Err(NetError::SocketRemoteClosed)));
    conn.close().unwrap();
    assert_eq!(pool.idle_count(), 1);

    // The dead idle connection is skipped and a fresh one dialed.
    let conn = pool.get().await.unwrap();
    drop(conn);
    settle().await;
    assert_eq!(server.accepts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_chatty_idle_connection_is_evicted() {
    let server = start_server(ServerMode::Chatter).await;
    let pool = pool_for(&server).await;

    let conn = pool.get().await.unwrap();
    settle().await;
    assert!(matches!(conn.check_liveness(), Err(NetError::DataReceivedUnexpectedly)));
    conn.close().unwrap();

    assert_eq!(pool.cleanup_idle(), 1);
    assert_eq!(pool.idle_count(), 0);
}

#[tokio::test]
async fn test_usability_handle_poisons_from_another_task() {
    let server = start_server(ServerMode::Hold).await;
    let pool = pool_for(&server).await;

    let conn = pool.get().await.unwrap();
    let handle = conn.usability_handle();
    tokio::spawn(async move { handle.mark_unusable() }).await.unwrap();

    assert!(!conn.is_usable());
    conn.close().unwrap();
    assert_eq!(pool.idle_count(), 0);
}

#[tokio::test]
async fn test_connection_outliving_pool_is_torn_down() {
    let mut server = start_server(ServerMode::Hold).await;
    let pool = pool_for(&server).await;

    let conn = pool.get().await.unwrap();
    let mut remote = server.accepted.recv().await.unwrap();
    drop(pool);

    conn.close().unwrap();
    let mut buf = [0u8; 1];
    assert_eq!(remote.read(&mut buf).await.unwrap(), 0);
}
