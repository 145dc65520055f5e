//! Bidirectional byte relay between a client and a remote stream.

use tokio::io::{self, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Copy bytes in both directions until either side finishes.
///
/// The two directions run concurrently. The first direction to finish,
/// whether by clean EOF, error, or cancellation from above, cancels
/// `token`, which tears the other direction down as well. Each direction
/// shuts down its write half on the way out, so both peers observe the
/// close.
///
/// Returns the bytes copied per direction (client->remote, remote->client).
/// A direction torn down mid-copy reports zero; the counts are best-effort,
/// as is delivery of the losing direction's final in-flight chunk.
pub async fn relay(
    proxy_name: &str,
    client: &mut TcpStream,
    remote: &mut TcpStream,
    token: &CancellationToken,
) -> (u64, u64) {
    let (mut client_read, mut client_write) = client.split();
    let (mut remote_read, mut remote_write) = remote.split();

    let client_to_remote = async {
        let copied = tokio::select! {
            result = io::copy(&mut client_read, &mut remote_write) => Some(result),
            _ = token.cancelled() => None,
        };
        let _ = remote_write.shutdown().await;
        token.cancel();
        copied
    };

    let remote_to_client = async {
        let copied = tokio::select! {
            result = io::copy(&mut remote_read, &mut client_write) => Some(result),
            _ = token.cancelled() => None,
        };
        let _ = client_write.shutdown().await;
        token.cancel();
        copied
    };

    let (up, down) = tokio::join!(client_to_remote, remote_to_client);

    (
        direction_total(proxy_name, "client->remote", up),
        direction_total(proxy_name, "remote->client", down),
    )
}

fn direction_total(
    proxy_name: &str,
    direction: &str,
    outcome: Option<io::Result<u64>>,
) -> u64 {
    match outcome {
        Some(Ok(bytes)) => bytes,
        Some(Err(error)) => {
            warn!(proxy = %proxy_name, direction, error = %error, "Copy error");
            0
        }
        // Torn down before the copy finished; the count is lost.
        None => 0,
    }
}
