use anyhow::{Context, Result};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::time::{sleep, timeout};
use tracing::{info, warn};

/// Wait between failed outbound connection attempts.
pub const RETRY_INTERVAL: Duration = Duration::from_secs(10);

/// Bound on a single outbound connection attempt.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// One active bidirectional byte stream between listener and agent.
///
/// Owned exclusively by the loop that created it; there is no concurrent
/// access and no locking.
pub struct Connection {
    stream: TcpStream,
    peer: SocketAddr,
}

impl Connection {
    pub fn new(stream: TcpStream) -> Result<Self> {
        let peer = stream.peer_addr()?;
        Ok(Self { stream, peer })
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    pub async fn send(&mut self, data: &[u8]) -> Result<()> {
        self.stream.write_all(data).await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// One bounded read. Returns `None` when the peer closed the stream.
    /// Payloads longer than `max` are truncated at the read boundary.
    pub async fn recv(&mut self, max: usize) -> Result<Option<String>> {
        let mut buf = vec![0u8; max];
        let n = self.stream.read(&mut buf).await?;
        if n == 0 {
            return Ok(None);
        }
        Ok(Some(String::from_utf8_lossy(&buf[..n]).into_owned()))
    }
}

/// Dial `addr` until a connection succeeds, waiting `retry_interval` between
/// attempts and bounding each attempt by `connect_timeout`.
///
/// Loops forever: the agent is expected to survive the listener disappearing
/// for arbitrary stretches and call back once it returns.
pub async fn connect_with_retry(
    addr: &str,
    retry_interval: Duration,
    connect_timeout: Duration,
) -> Connection {
    loop {
        match timeout(connect_timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => match Connection::new(stream) {
                Ok(conn) => {
                    info!("Connected to {}", addr);
                    return conn;
                }
                Err(e) => warn!("Connection to {} unusable: {}", addr, e),
            },
            Ok(Err(e)) => warn!(
                "Connection to {} failed: {}. Retrying in {:?}",
                addr, e, retry_interval
            ),
            Err(_) => warn!(
                "Connection attempt to {} timed out. Retrying in {:?}",
                addr, retry_interval
            ),
        }
        sleep(retry_interval).await;
    }
}

/// A bound TCP listener that accepts exactly one session.
pub struct SessionListener {
    inner: TcpListener,
}

impl SessionListener {
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.inner.local_addr()?)
    }

    /// Block until one inbound connection arrives.
    pub async fn accept_one(&self) -> Result<Connection> {
        let (stream, _) = self.inner.accept().await?;
        Connection::new(stream)
    }
}

/// Bind with address reuse and a backlog of one pending connection.
/// A bind failure (port in use, permission denied) is fatal for the caller.
pub async fn bind_single(ip: IpAddr, port: u16) -> Result<SessionListener> {
    let addr = SocketAddr::new(ip, port);
    let socket = match addr {
        SocketAddr::V4(_) => TcpSocket::new_v4()?,
        SocketAddr::V6(_) => TcpSocket::new_v6()?,
    };
    socket.set_reuseaddr(true)?;
    socket
        .bind(addr)
        .with_context(|| format!("failed to bind {}", addr))?;
    let inner = socket.listen(1)?;
    Ok(SessionListener { inner })
}
