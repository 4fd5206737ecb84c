//! Backend-agnostic request layer for a remote API server.
//!
//! # Overview
//! Callers issue GET/POST requests through the `Transport` trait and get a
//! `ResponseEnvelope` back, whichever backend did the network I/O.
//!
//! # Design
//! - `params` is the shared policy: multipart detection, file descriptor
//!   validation, query and multipart encoding.
//! - `policy` holds the per-request decisions both transports make the same
//!   way: verb normalization, TLS selection, host resolution.
//! - `SocketTransport` opens one blocking connection per call and encodes
//!   multipart bodies itself.
//! - `EngineTransport` dispatches through a pooled client and delegates every
//!   multipart request to a private `SocketTransport`.
//! - `ServiceConfig` is passed to each constructor; there is no global state.

pub mod config;
pub mod engine;
pub mod error;
pub mod http;
pub mod params;
pub mod policy;
pub mod socket;
pub mod transport;
pub mod types;

pub use config::{Backend, ServiceConfig};
pub use engine::EngineTransport;
pub use error::{ConfigError, TransportError};
pub use http::{HttpMethod, ResponseEnvelope};
pub use params::{
    encode_multipart_params, encode_query_params, is_valid_file_descriptor, requires_multipart,
    MultipartForm,
};
pub use socket::SocketTransport;
pub use transport::{connect, Transport};
pub use types::{EngineOptions, FileDescriptor, FileSource, ParamValue, Params, RequestOptions};
