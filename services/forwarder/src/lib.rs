pub mod config;
pub mod proxy;

pub use config::{Config, ProxyDefinition};
pub use proxy::{ProxyError, ProxyHandle, ProxyManager};
