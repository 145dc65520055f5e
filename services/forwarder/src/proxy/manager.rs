//! Proxy lifecycle management.
//!
//! The [`ProxyManager`] owns the full set of running proxies. It starts one
//! listener per enabled definition, keys the running proxies by name in a
//! mutex-guarded registry, and coordinates shutdown: cancel every scope,
//! then wait until the transitive closure of spawned work (accept loops
//! and in-flight relays alike) has exited.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::info;

use super::error::ProxyError;
use super::listener::run_accept_loop;
use crate::config::ProxyDefinition;

/// Registry entry for one running proxy.
///
/// The listening socket itself is owned by the accept-loop task; the handle
/// carries everything the manager needs to observe and cancel the proxy.
pub struct ProxyHandle {
    /// The definition this proxy was started from.
    pub(super) definition: ProxyDefinition,
    /// The address actually bound (resolves port 0 to the assigned port).
    pub(super) local_addr: SocketAddr,
    /// Cancellation scope for this proxy, a child of the manager's root.
    pub(super) cancel: CancellationToken,
    /// Advisory flag, cleared when the accept loop exits.
    pub(super) active: AtomicBool,
}

impl ProxyHandle {
    /// The definition this proxy was started from.
    pub fn definition(&self) -> &ProxyDefinition {
        &self.definition
    }

    /// The address the proxy is listening on.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Whether the accept loop is still running.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }
}

/// Owns and runs the configured set of proxies.
pub struct ProxyManager {
    /// Definitions in configuration order.
    definitions: Vec<ProxyDefinition>,
    /// Running proxies keyed by name. Reads and writes both take the lock.
    proxies: Mutex<HashMap<String, Arc<ProxyHandle>>>,
    /// Root cancellation scope; every proxy and connection scope descends
    /// from it.
    shutdown: CancellationToken,
    /// All spawned work: accept loops and per-connection tasks.
    tasks: TaskTracker,
}

impl ProxyManager {
    /// Create a manager for a set of proxy definitions.
    pub fn new(definitions: Vec<ProxyDefinition>) -> Self {
        Self {
            definitions,
            proxies: Mutex::new(HashMap::new()),
            shutdown: CancellationToken::new(),
            tasks: TaskTracker::new(),
        }
    }

    /// Start every enabled proxy, in definition order.
    ///
    /// Disabled definitions are skipped without opening a socket. The first
    /// bind failure aborts startup and propagates; proxies started by
    /// earlier iterations keep running, so the caller should still
    /// [`shutdown`](Self::shutdown) on error.
    pub async fn start(&self) -> Result<(), ProxyError> {
        for definition in &self.definitions {
            if !definition.enabled {
                info!(proxy = %definition.name, "Skipping disabled proxy");
                continue;
            }
            self.start_proxy(definition.clone()).await?;
        }
        Ok(())
    }

    /// Bind and start a single proxy, registering it under its name.
    pub async fn start_proxy(&self, definition: ProxyDefinition) -> Result<(), ProxyError> {
        let mut proxies = self.proxies.lock().await;

        let bind_addr = definition.local_addr();
        let listener = TcpListener::bind(bind_addr.as_str())
            .await
            .map_err(|source| ProxyError::Bind {
                name: definition.name.clone(),
                addr: bind_addr.clone(),
                source,
            })?;
        let local_addr = listener.local_addr().map_err(|source| ProxyError::Bind {
            name: definition.name.clone(),
            addr: bind_addr.clone(),
            source,
        })?;

        let handle = Arc::new(ProxyHandle {
            cancel: self.shutdown.child_token(),
            active: AtomicBool::new(true),
            local_addr,
            definition,
        });
        proxies.insert(handle.definition.name.clone(), Arc::clone(&handle));

        info!(
            proxy = %handle.definition.name,
            local_addr = %local_addr,
            remote_addr = %handle.definition.remote_addr(),
            "Started proxy"
        );

        self.tasks
            .spawn(run_accept_loop(listener, handle, self.tasks.clone()));

        Ok(())
    }

    /// Look up a running proxy by name.
    pub async fn proxy(&self, name: &str) -> Option<Arc<ProxyHandle>> {
        self.proxies.lock().await.get(name).cloned()
    }

    /// The bound address of a running proxy, if any.
    pub async fn local_addr(&self, name: &str) -> Option<SocketAddr> {
        self.proxy(name).await.map(|handle| handle.local_addr)
    }

    /// Cancel everything and wait for all spawned work to exit.
    ///
    /// Cancels the root scope, then each registered proxy's own scope, then
    /// blocks until every accept loop and relay task has finished. Safe to
    /// call more than once; repeat calls are no-ops that wait for the same
    /// completion.
    pub async fn shutdown(&self) {
        info!("Shutting down proxy manager");

        self.shutdown.cancel();

        {
            let proxies = self.proxies.lock().await;
            for (name, proxy) in proxies.iter() {
                info!(proxy = %name, "Closing proxy");
                proxy.cancel.cancel();
            }
        }

        self.tasks.close();
        self.tasks.wait().await;

        info!("Proxy manager shutdown complete");
    }
}
