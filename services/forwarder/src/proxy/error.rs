//! Error types for the forwarding engine.

use std::io;

use thiserror::Error;

/// Forwarding engine errors.
///
/// Bind failures are fatal to startup and propagate out of
/// [`ProxyManager::start`](super::ProxyManager::start). Everything that can
/// go wrong after a proxy is listening stays scoped to a single connection.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Local listen failed (port in use, permission denied, bad address).
    #[error("failed to listen on {addr} for proxy {name}: {source}")]
    Bind {
        name: String,
        addr: String,
        #[source]
        source: io::Error,
    },

    /// All dial attempts to the remote target failed.
    #[error("remote {addr} unreachable after {attempts} attempts: {source}")]
    RemoteUnreachable {
        addr: String,
        attempts: u32,
        #[source]
        source: io::Error,
    },

    /// Shutdown was requested while the operation was in flight.
    #[error("canceled by shutdown")]
    Canceled,
}
