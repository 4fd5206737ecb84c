//! Error types for the transport layer.
//!
//! # Design
//! Transports perform no local recovery: connection, DNS, TLS and I/O
//! failures surface to the caller unchanged, wrapped in `TransportError`.
//! A non-2xx status is not an error; it comes back as a normal
//! `ResponseEnvelope`. Configuration loading has its own `ConfigError` so a
//! bad config file is reported before any transport exists.

use thiserror::Error;

/// Errors returned by `Transport::make_request` and transport constructors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The socket client failed to connect, negotiate TLS, or exchange data.
    #[error("socket transport failed: {0}")]
    Http(#[from] ureq::Error),

    /// The engine failed to build its client or dispatch the request.
    #[error("engine transport failed: {0}")]
    Engine(#[from] reqwest::Error),

    /// A file part could not be opened or read, or the body could not be read.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The service configuration is unusable for this transport.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Errors produced while loading a `ServiceConfig`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

impl From<ConfigError> for TransportError {
    fn from(err: ConfigError) -> Self {
        TransportError::Config(err.to_string())
    }
}
