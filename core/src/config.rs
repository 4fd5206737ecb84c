//! Service configuration handed to every transport constructor.
//!
//! Values are set once during setup and only read afterwards, so a
//! transport keeps its own copy and needs no synchronization.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

pub const DEFAULT_GRAPH_HOST: &str = "graph.facebook.com";
pub const DEFAULT_REST_HOST: &str = "api.facebook.com";

/// Which transport `transport::connect` builds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// One blocking connection per call, multipart capable.
    Socket,
    /// Pooled engine client, falls back to `Socket` for uploads.
    #[default]
    Engine,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Force TLS for every request of this service.
    pub always_use_ssl: bool,
    pub graph_host: String,
    pub rest_host: String,
    pub http_port: u16,
    pub https_port: u16,
    /// Skip certificate-chain validation on TLS connections. Insecure, off
    /// unless explicitly enabled.
    pub accept_invalid_certs: bool,
    pub timeout_secs: Option<u64>,
    pub user_agent: String,
    pub proxy: Option<String>,
    pub backend: Backend,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            always_use_ssl: false,
            graph_host: DEFAULT_GRAPH_HOST.to_string(),
            rest_host: DEFAULT_REST_HOST.to_string(),
            http_port: 80,
            https_port: 443,
            accept_invalid_certs: false,
            timeout_secs: None,
            user_agent: concat!("api-transport/", env!("CARGO_PKG_VERSION")).to_string(),
            proxy: None,
            backend: Backend::default(),
        }
    }
}

impl ServiceConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: ServiceConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.graph_host.trim().is_empty() {
            return Err(ConfigError::Invalid("graph_host must not be empty".into()));
        }
        if self.rest_host.trim().is_empty() {
            return Err(ConfigError::Invalid("rest_host must not be empty".into()));
        }
        if self.http_port == 0 || self.https_port == 0 {
            return Err(ConfigError::Invalid("ports must be non-zero".into()));
        }
        if let Some(proxy) = &self.proxy {
            if !(proxy.starts_with("http://")
                || proxy.starts_with("https://")
                || proxy.starts_with("socks5://"))
            {
                return Err(ConfigError::Invalid(format!(
                    "proxy must be an http, https or socks5 url: {proxy}"
                )));
            }
        }
        Ok(())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Builder-style toggle for the service-wide TLS flag.
    pub fn with_always_use_ssl(mut self, on: bool) -> Self {
        self.always_use_ssl = on;
        self
    }
}
