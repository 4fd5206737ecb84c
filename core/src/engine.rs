//! Pooled transport built on the `reqwest` blocking client.
//!
//! # Design
//! The engine keeps one client (and its connection pool) for the life of the
//! transport. It never encodes multipart bodies: any request that needs one
//! is handed, untouched, to the fallback transport it owns, and the
//! fallback's envelope is returned as is.

use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::ServiceConfig;
use crate::error::TransportError;
use crate::http::{collect_headers, HttpMethod, ResponseEnvelope};
use crate::params::{encode_query_params, requires_multipart};
use crate::policy::{normalize_verb, requires_secure, with_query, Target};
use crate::socket::SocketTransport;
use crate::transport::Transport;
use crate::types::{EngineOptions, Params, RequestOptions};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Request defaults after the caller's engine overrides are applied.
#[derive(Debug)]
pub struct MergedOptions {
    pub params: Params,
    pub headers: Vec<(String, String)>,
    pub timeout: Option<Duration>,
}

/// Merge `{params}` with the caller's engine options. When both define
/// `params`, the caller's value wins and replaces the whole map.
pub fn merge_engine_options(params: Params, overrides: &EngineOptions) -> MergedOptions {
    let params = match &overrides.params {
        Some(pairs) => pairs.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        None => params,
    };
    MergedOptions {
        params,
        headers: overrides.headers.clone(),
        timeout: overrides.timeout,
    }
}

#[derive(Debug)]
pub struct EngineTransport<F = SocketTransport> {
    config: ServiceConfig,
    client: Client,
    fallback: F,
}

impl EngineTransport<SocketTransport> {
    /// Engine transport whose uploads go through a `SocketTransport` sharing
    /// the same configuration.
    pub fn new(config: ServiceConfig) -> Result<Self, TransportError> {
        let fallback = SocketTransport::new(config.clone())?;
        Self::with_fallback(config, fallback)
    }
}

impl<F: Transport> EngineTransport<F> {
    pub fn with_fallback(config: ServiceConfig, fallback: F) -> Result<Self, TransportError> {
        config.validate()?;
        let mut builder = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout())
            .danger_accept_invalid_certs(config.accept_invalid_certs);
        if let Some(proxy) = &config.proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy)?);
        }
        let client = builder.build()?;
        Ok(Self {
            config,
            client,
            fallback,
        })
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn fallback(&self) -> &F {
        &self.fallback
    }
}

impl<F: Transport> Transport for EngineTransport<F> {
    fn make_request(
        &self,
        path: &str,
        mut params: Params,
        verb: &str,
        options: &RequestOptions,
    ) -> Result<ResponseEnvelope, TransportError> {
        if requires_multipart(&params) {
            debug!(backend = "engine", path, "multipart request, delegating to fallback transport");
            return self.fallback.make_request(path, params, verb, options);
        }

        let method = normalize_verb(verb, &mut params);
        let secure = requires_secure(&params, &self.config, options);
        let target = Target::resolve(&self.config, options, secure);
        if secure && self.config.accept_invalid_certs {
            warn!(host = %target.host, "certificate validation disabled for this request");
        }
        let url = target.url(path);
        let merged = merge_engine_options(params, &options.engine);
        let encoded = encode_query_params(Some(&merged.params));

        let mut request = match method {
            HttpMethod::Get => {
                let url = with_query(url, &encoded);
                debug!(backend = "engine", method = "GET", %url, "dispatching request");
                self.client.get(url)
            }
            HttpMethod::Post => {
                debug!(backend = "engine", method = "POST", %url, "dispatching request");
                self.client
                    .post(url)
                    .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
                    .body(encoded)
            }
        };
        for (name, value) in &merged.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(timeout) = merged.timeout {
            request = request.timeout(timeout);
        }

        let response = request.send()?;
        let status = response.status().as_u16();
        let headers = collect_headers(
            response
                .headers()
                .iter()
                .map(|(name, value)| (name.as_str(), value.as_bytes())),
        );
        let body = response.bytes()?.to_vec();
        debug!(backend = "engine", status, bytes = body.len(), "response received");

        Ok(ResponseEnvelope::new(status, body, headers))
    }
}
