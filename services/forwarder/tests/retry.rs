mod harness;

use std::net::SocketAddr;
use std::time::Duration;

use harness::{dead_port, definition, start_manager};
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::time::{timeout, Instant};

#[tokio::test]
async fn unreachable_remote_retries_then_closes_the_client() {
    let port = dead_port().await;
    let remote: SocketAddr = format!("127.0.0.1:{port}").parse().unwrap();

    let manager = start_manager(vec![definition("doomed", 0, remote, true)]).await;
    let addr = manager.local_addr("doomed").await.unwrap();

    let started = Instant::now();
    let mut stream = TcpStream::connect(addr).await.unwrap();

    let mut buf = [0u8; 8];
    let outcome = timeout(Duration::from_secs(8), stream.read(&mut buf))
        .await
        .expect("client should be closed once the dialer gives up");
    match outcome {
        Ok(0) | Err(_) => {}
        Ok(n) => panic!("unexpected {n} bytes from a dead remote"),
    }

    // Refused connects fail immediately on loopback, so the elapsed time is
    // dominated by the 1s + 2s backoff between the three attempts.
    let elapsed = started.elapsed();
    assert!(
        elapsed >= Duration::from_secs(3),
        "expected backoff between attempts, got {elapsed:?}"
    );

    // The failure is scoped to that one connection: the proxy still accepts.
    let handle = manager.proxy("doomed").await.unwrap();
    assert!(handle.is_active());
    let extra = TcpStream::connect(addr).await;
    assert!(extra.is_ok());

    // The extra connection is now mid-dial; shutdown must interrupt it
    // rather than wait out the remaining attempts.
    timeout(Duration::from_secs(2), manager.shutdown())
        .await
        .expect("an in-flight dial should not delay shutdown");
}
