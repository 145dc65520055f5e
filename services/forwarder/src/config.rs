//! Forwarder configuration.
//!
//! The forwarder is driven by a YAML file listing named proxy definitions.
//! The file path comes from the `CONFIG_PATH` environment variable and
//! defaults to `/config/proxies.yml`.
//!
//! ```yaml
//! proxies:
//!   - name: postgres
//!     local_host: 0.0.0.0
//!     local_port: 15432
//!     remote_host: db.internal
//!     remote_port: 5432
//!     enabled: true
//! ```

use std::collections::HashSet;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "/config/proxies.yml";

/// Address used when a definition omits `local_host`.
pub const WILDCARD_HOST: &str = "0.0.0.0";

/// One forwarding rule: a local listen address mapped to a remote target.
#[derive(Debug, Clone, Deserialize)]
pub struct ProxyDefinition {
    /// Unique name, used as the registry key and in log events.
    pub name: String,

    /// Local bind host. Empty means all interfaces.
    #[serde(default)]
    pub local_host: String,

    /// Local bind port. Zero asks the OS for an ephemeral port.
    pub local_port: u16,

    /// Remote target host.
    pub remote_host: String,

    /// Remote target port.
    pub remote_port: u16,

    /// Whether this proxy should be started. Defaults to false.
    #[serde(default)]
    pub enabled: bool,
}

impl ProxyDefinition {
    /// The `host:port` string this proxy listens on.
    pub fn local_addr(&self) -> String {
        format!("{}:{}", self.local_host, self.local_port)
    }

    /// The `host:port` string this proxy dials.
    pub fn remote_addr(&self) -> String {
        format!("{}:{}", self.remote_host, self.remote_port)
    }
}

/// Forwarder configuration (YAML-driven).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Proxy definitions, started in file order.
    #[serde(default)]
    pub proxies: Vec<ProxyDefinition>,
}

impl Config {
    /// Resolve the configuration file path from the environment.
    pub fn path_from_env() -> String {
        std::env::var("CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
    }

    /// Load, default-fill, and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::parse(&data).with_context(|| format!("failed to parse config {}", path.display()))
    }

    /// Parse configuration from a YAML string.
    pub fn parse(data: &str) -> Result<Self> {
        let mut config: Config = serde_yaml::from_str(data)?;
        config.apply_defaults();
        config.validate()?;
        Ok(config)
    }

    fn apply_defaults(&mut self) {
        for definition in &mut self.proxies {
            if definition.local_host.is_empty() {
                definition.local_host = WILDCARD_HOST.to_string();
            }
        }
    }

    fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for definition in &self.proxies {
            if !seen.insert(definition.name.as_str()) {
                bail!("duplicate proxy name: {}", definition.name);
            }
        }
        Ok(())
    }
}
