//! Direct, one-connection-per-call transport built on `ureq`.
//!
//! # Design
//! Every call builds a fresh agent, performs a single blocking round trip and
//! drops the agent, closing its connection. This is the only transport that
//! encodes multipart bodies itself; the engine transport hands uploads to it.
//! Non-2xx statuses come back as data so the caller sees the server's body.

use std::io::Read;

use tracing::{debug, warn};

use crate::config::ServiceConfig;
use crate::error::TransportError;
use crate::http::{collect_headers, HttpMethod, ResponseEnvelope};
use crate::params::{encode_multipart_params, encode_query_params, requires_multipart};
use crate::policy::{normalize_verb, requires_secure, with_query, Target};
use crate::transport::Transport;
use crate::types::{Params, RequestOptions};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

#[derive(Debug, Clone)]
pub struct SocketTransport {
    config: ServiceConfig,
}

impl SocketTransport {
    pub fn new(config: ServiceConfig) -> Result<Self, TransportError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    fn agent(&self, target: &Target) -> Result<ureq::Agent, TransportError> {
        let mut builder = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(self.config.timeout());
        if target.secure && self.config.accept_invalid_certs {
            warn!(
                host = %target.host,
                "certificate validation disabled for this connection"
            );
            builder = builder.tls_config(
                ureq::tls::TlsConfig::builder()
                    .disable_verification(true)
                    .build(),
            );
        }
        if let Some(proxy) = &self.config.proxy {
            builder = builder.proxy(Some(ureq::Proxy::new(proxy)?));
        }
        Ok(builder.build().new_agent())
    }
}

impl Transport for SocketTransport {
    fn make_request(
        &self,
        path: &str,
        mut params: Params,
        verb: &str,
        options: &RequestOptions,
    ) -> Result<ResponseEnvelope, TransportError> {
        let method = normalize_verb(verb, &mut params);
        let secure = requires_secure(&params, &self.config, options);
        let target = Target::resolve(&self.config, options, secure);
        let url = target.url(path);
        let agent = self.agent(&target)?;
        let user_agent = self.config.user_agent.as_str();

        let response = match method {
            HttpMethod::Get => {
                let url = with_query(url, &encode_query_params(Some(&params)));
                debug!(backend = "socket", method = "GET", %url, "dispatching request");
                agent.get(&url).header("User-Agent", user_agent).call()?
            }
            HttpMethod::Post if requires_multipart(&params) => {
                debug!(backend = "socket", method = "POST", %url, multipart = true, "dispatching request");
                let form = encode_multipart_params(params)?;
                let content_type = form.content_type();
                let mut body = form.into_reader();
                agent
                    .post(&url)
                    .header("User-Agent", user_agent)
                    .content_type(content_type)
                    .send(ureq::SendBody::from_reader(&mut body))?
            }
            HttpMethod::Post => {
                debug!(backend = "socket", method = "POST", %url, multipart = false, "dispatching request");
                let body = encode_query_params(Some(&params));
                agent
                    .post(&url)
                    .header("User-Agent", user_agent)
                    .content_type(FORM_CONTENT_TYPE)
                    .send(body.as_bytes())?
            }
        };

        let status = response.status().as_u16();
        let headers = collect_headers(
            response
                .headers()
                .iter()
                .map(|(name, value)| (name.as_str(), value.as_bytes())),
        );
        let mut body = Vec::new();
        response.into_body().into_reader().read_to_end(&mut body)?;
        debug!(backend = "socket", status, bytes = body.len(), "response received");

        Ok(ResponseEnvelope::new(status, body, headers))
    }
}
