//! Test harness for forwarder integration tests.
//!
//! Provides helpers to spawn echo and marker backends, start managers from
//! inline definitions, and run bounded roundtrips through a proxy.

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::time::timeout;

use portbridge_forwarder::{ProxyDefinition, ProxyManager};

/// A TCP backend that echoes everything it receives, per connection.
#[allow(dead_code)]
pub struct TcpEchoBackend {
    pub addr: SocketAddr,
    pub connections: Arc<AtomicU64>,
    pub bytes_received: Arc<AtomicU64>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl TcpEchoBackend {
    pub async fn spawn() -> io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let connections = Arc::new(AtomicU64::new(0));
        let bytes_received = Arc::new(AtomicU64::new(0));

        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        let conn_clone = Arc::clone(&connections);
        let bytes_clone = Arc::clone(&bytes_received);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    accept_result = listener.accept() => {
                        match accept_result {
                            Ok((mut stream, _)) => {
                                conn_clone.fetch_add(1, Ordering::Relaxed);
                                let bytes = Arc::clone(&bytes_clone);
                                tokio::spawn(async move {
                                    let mut buf = vec![0u8; 8192];
                                    loop {
                                        match stream.read(&mut buf).await {
                                            Ok(0) => break,
                                            Ok(n) => {
                                                bytes.fetch_add(n as u64, Ordering::Relaxed);
                                                if stream.write_all(&buf[..n]).await.is_err() {
                                                    break;
                                                }
                                            }
                                            Err(_) => break,
                                        }
                                    }
                                });
                            }
                            Err(_) => break,
                        }
                    }
                    _ = &mut shutdown_rx => break,
                }
            }
        });

        Ok(Self {
            addr,
            connections,
            bytes_received,
            shutdown_tx: Some(shutdown_tx),
        })
    }

    #[allow(dead_code)]
    pub fn connection_count(&self) -> u64 {
        self.connections.load(Ordering::Relaxed)
    }
}

impl Drop for TcpEchoBackend {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// A TCP backend that answers any request with a fixed marker and closes.
///
/// Useful for proving which backend a proxied connection landed on.
#[allow(dead_code)]
pub struct MarkerBackend {
    pub addr: SocketAddr,
    pub marker: String,
    pub connections: Arc<AtomicU64>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

#[allow(dead_code)]
impl MarkerBackend {
    pub async fn spawn(marker: &str) -> io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let connections = Arc::new(AtomicU64::new(0));

        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        let conn_clone = Arc::clone(&connections);
        let marker_bytes = marker.as_bytes().to_vec();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    accept_result = listener.accept() => {
                        match accept_result {
                            Ok((mut stream, _)) => {
                                conn_clone.fetch_add(1, Ordering::Relaxed);
                                let response = marker_bytes.clone();
                                tokio::spawn(async move {
                                    let mut buf = vec![0u8; 1024];
                                    if stream.read(&mut buf).await.is_ok() {
                                        let _ = stream.write_all(&response).await;
                                    }
                                });
                            }
                            Err(_) => break,
                        }
                    }
                    _ = &mut shutdown_rx => break,
                }
            }
        });

        Ok(Self {
            addr,
            marker: marker.to_string(),
            connections,
            shutdown_tx: Some(shutdown_tx),
        })
    }

    pub fn connection_count(&self) -> u64 {
        self.connections.load(Ordering::Relaxed)
    }
}

impl Drop for MarkerBackend {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Build a loopback proxy definition targeting `remote`.
#[allow(dead_code)]
pub fn definition(name: &str, local_port: u16, remote: SocketAddr, enabled: bool) -> ProxyDefinition {
    ProxyDefinition {
        name: name.to_string(),
        local_host: "127.0.0.1".to_string(),
        local_port,
        remote_host: remote.ip().to_string(),
        remote_port: remote.port(),
        enabled,
    }
}

/// Construct and start a manager, panicking on startup failure.
#[allow(dead_code)]
pub async fn start_manager(definitions: Vec<ProxyDefinition>) -> Arc<ProxyManager> {
    let manager = Arc::new(ProxyManager::new(definitions));
    manager.start().await.expect("manager start");
    manager
}

/// Reserve a loopback port that nothing is listening on.
#[allow(dead_code)]
pub async fn dead_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind probe listener");
    let port = listener.local_addr().expect("probe addr").port();
    drop(listener);
    port
}

/// Connect, send `payload`, and read one bounded response.
#[allow(dead_code)]
pub async fn try_roundtrip(addr: SocketAddr, payload: &[u8]) -> Result<Vec<u8>, &'static str> {
    let result = timeout(Duration::from_millis(500), async {
        let mut stream = TcpStream::connect(addr).await?;
        stream.write_all(payload).await?;
        stream.flush().await?;
        let mut buf = vec![0u8; 64];
        let n = stream.read(&mut buf).await?;
        Ok::<_, io::Error>(buf[..n].to_vec())
    })
    .await;

    match result {
        Ok(Ok(data)) if !data.is_empty() => Ok(data),
        Ok(Ok(_)) => Err("connection closed"),
        Ok(Err(_)) => Err("io error"),
        Err(_) => Err("timeout"),
    }
}
