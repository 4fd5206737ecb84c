//! The entry point shared by every backend.

use tracing::info;

use crate::config::{Backend, ServiceConfig};
use crate::engine::EngineTransport;
use crate::error::TransportError;
use crate::http::ResponseEnvelope;
use crate::socket::SocketTransport;
use crate::types::{Params, RequestOptions};

/// Performs one blocking request and returns the server's response.
///
/// `verb` may be any HTTP verb; anything other than GET or POST is sent as a
/// POST carrying a `method` parameter. `params` is consumed because file
/// streams inside it can only be read once.
pub trait Transport {
    fn make_request(
        &self,
        path: &str,
        params: Params,
        verb: &str,
        options: &RequestOptions,
    ) -> Result<ResponseEnvelope, TransportError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn make_request(
        &self,
        path: &str,
        params: Params,
        verb: &str,
        options: &RequestOptions,
    ) -> Result<ResponseEnvelope, TransportError> {
        (**self).make_request(path, params, verb, options)
    }
}

/// Build the backend named by `config.backend`.
pub fn connect(config: ServiceConfig) -> Result<Box<dyn Transport + Send + Sync>, TransportError> {
    info!(
        backend = ?config.backend,
        always_use_ssl = config.always_use_ssl,
        accept_invalid_certs = config.accept_invalid_certs,
        "building transport"
    );
    Ok(match config.backend {
        Backend::Socket => Box::new(SocketTransport::new(config)?),
        Backend::Engine => Box::new(EngineTransport::new(config)?),
    })
}
