//! TCP forwarding engine.
//!
//! This module provides:
//! - Proxy lifecycle management keyed by definition name
//! - A per-proxy accept loop with cancellation
//! - Outbound dialing with bounded retry and linear backoff
//! - Bidirectional byte relay between client and remote
//!
//! ## Architecture
//!
//! ```text
//! ProxyManager -> accept loop (per proxy) -> dial remote -> relay
//!       |               |                         |
//!       +--- root token +--- proxy token ---------+--- connection token
//! ```
//!
//! Cancellation flows top-down through the token hierarchy: shutting down
//! the manager cancels every accept loop and every in-flight relay, and the
//! manager then waits for all of that work to finish.

mod dial;
mod error;
mod listener;
mod manager;
mod relay;

pub use error::ProxyError;
pub use manager::{ProxyHandle, ProxyManager};
