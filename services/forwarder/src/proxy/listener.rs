//! Per-proxy accept loop and connection handling.

use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use super::dial::connect_with_retry;
use super::error::ProxyError;
use super::manager::ProxyHandle;
use super::relay::relay;

/// Brief pause after a transient accept error, avoiding a tight loop on
/// persistent failures.
const ACCEPT_RETRY_PAUSE: Duration = Duration::from_millis(100);

/// Accept connections for one proxy until its cancellation token fires.
///
/// Each accepted connection gets its own task, spawned through the shared
/// tracker so manager shutdown waits for it; the loop itself goes straight
/// back to accepting. A transient accept error is logged and the loop
/// continues; only cancellation ends it. The listening socket closes when
/// the loop returns and drops it.
pub(super) async fn run_accept_loop(
    listener: TcpListener,
    proxy: Arc<ProxyHandle>,
    tasks: TaskTracker,
) {
    loop {
        tokio::select! {
            result = listener.accept() => match result {
                Ok((stream, peer_addr)) => {
                    tasks.spawn(handle_connection(Arc::clone(&proxy), stream, peer_addr));
                }
                Err(error) => {
                    if proxy.cancel.is_cancelled() {
                        break;
                    }
                    warn!(
                        proxy = %proxy.definition.name,
                        error = %error,
                        "Failed to accept connection"
                    );
                    tokio::time::sleep(ACCEPT_RETRY_PAUSE).await;
                }
            },
            _ = proxy.cancel.cancelled() => break,
        }
    }

    proxy.active.store(false, Ordering::Relaxed);
    info!(proxy = %proxy.definition.name, "Proxy closed");
}

/// Handle one accepted client connection: dial the remote, then relay.
///
/// Dial failure closes the client socket and ends here; the proxy and its
/// other connections are unaffected.
async fn handle_connection(proxy: Arc<ProxyHandle>, mut client: TcpStream, peer_addr: SocketAddr) {
    let token = proxy.cancel.child_token();
    let remote_addr = proxy.definition.remote_addr();

    let mut remote = match connect_with_retry(&remote_addr, &token).await {
        Ok(stream) => stream,
        Err(ProxyError::Canceled) => return,
        Err(error) => {
            warn!(
                proxy = %proxy.definition.name,
                remote_addr = %remote_addr,
                error = %error,
                "Giving up on remote"
            );
            return;
        }
    };

    info!(
        proxy = %proxy.definition.name,
        client_addr = %peer_addr,
        remote_addr = %remote_addr,
        "Established connection"
    );

    let (to_remote, from_remote) =
        relay(&proxy.definition.name, &mut client, &mut remote, &token).await;

    debug!(
        proxy = %proxy.definition.name,
        client_addr = %peer_addr,
        bytes_to_remote = to_remote,
        bytes_from_remote = from_remote,
        "Connection closed"
    );
}
