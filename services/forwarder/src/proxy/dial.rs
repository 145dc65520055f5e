//! Outbound connection establishment with bounded retry.

use std::io;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::error::ProxyError;

/// Maximum number of connection attempts per accepted client.
pub const CONNECT_ATTEMPTS: u32 = 3;

/// Upper bound on a single connection attempt.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Backoff before the next attempt, or `None` after the final one.
///
/// Attempts are numbered from 1; the delay grows linearly with the attempt
/// number (1s after the first failure, 2s after the second).
pub fn retry_delay(attempt: u32) -> Option<Duration> {
    (attempt < CONNECT_ATTEMPTS).then(|| Duration::from_secs(u64::from(attempt)))
}

/// Dial `addr`, retrying up to [`CONNECT_ATTEMPTS`] times.
///
/// Each attempt is bounded by [`CONNECT_TIMEOUT`]. Both the attempt and the
/// backoff sleep race `token` so an in-flight dial never delays shutdown.
pub async fn connect_with_retry(
    addr: &str,
    token: &CancellationToken,
) -> Result<TcpStream, ProxyError> {
    let mut last_error = None;

    for attempt in 1..=CONNECT_ATTEMPTS {
        let result = tokio::select! {
            result = timeout(CONNECT_TIMEOUT, TcpStream::connect(addr)) => match result {
                Ok(result) => result,
                Err(_) => Err(io::Error::new(io::ErrorKind::TimedOut, "connect timeout")),
            },
            _ = token.cancelled() => return Err(ProxyError::Canceled),
        };

        match result {
            Ok(stream) => return Ok(stream),
            Err(error) => {
                warn!(
                    attempt,
                    remote_addr = %addr,
                    error = %error,
                    "Connection attempt failed"
                );
                last_error = Some(error);
            }
        }

        if let Some(delay) = retry_delay(attempt) {
            tokio::select! {
                _ = sleep(delay) => {}
                _ = token.cancelled() => return Err(ProxyError::Canceled),
            }
        }
    }

    Err(ProxyError::RemoteUnreachable {
        addr: addr.to_string(),
        attempts: CONNECT_ATTEMPTS,
        source: last_error.unwrap_or_else(|| io::Error::other("no connection attempt made")),
    })
}
