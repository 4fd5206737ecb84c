//! Per-request decisions made identically by both transports: which method
//! goes on the wire, whether the call needs TLS, and which host it targets.

use crate::config::ServiceConfig;
use crate::http::HttpMethod;
use crate::types::{Params, RequestOptions};

/// Parameter whose presence marks a request as carrying credentials.
pub const ACCESS_TOKEN_PARAM: &str = "access_token";
/// Parameter that carries a tunnelled verb.
pub const METHOD_PARAM: &str = "method";

/// Map `verb` onto GET or POST. Any other verb is tunnelled through POST with
/// `method=<verb>` added to `params`.
pub fn normalize_verb(verb: &str, params: &mut Params) -> HttpMethod {
    let verb = verb.trim().to_ascii_lowercase();
    match verb.as_str() {
        "get" => HttpMethod::Get,
        "post" => HttpMethod::Post,
        _ => {
            params.insert(METHOD_PARAM, verb);
            HttpMethod::Post
        }
    }
}

/// TLS is required when the request carries an access token, the service
/// forces it, or the caller asked for it.
pub fn requires_secure(params: &Params, config: &ServiceConfig, options: &RequestOptions) -> bool {
    params.contains_key(ACCESS_TOKEN_PARAM) || config.always_use_ssl || options.use_ssl
}

/// Where a single request goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub host: String,
    pub port: u16,
    pub secure: bool,
}

impl Target {
    pub fn resolve(config: &ServiceConfig, options: &RequestOptions, secure: bool) -> Self {
        let host = if options.rest_api {
            config.rest_host.clone()
        } else {
            config.graph_host.clone()
        };
        let port = if secure { config.https_port } else { config.http_port };
        Self { host, port, secure }
    }

    pub fn scheme(&self) -> &'static str {
        if self.secure {
            "https"
        } else {
            "http"
        }
    }

    /// `scheme://host[:port]path`. The port is left out when it is the
    /// scheme's default.
    pub fn url(&self, path: &str) -> String {
        let default_port = if self.secure { 443 } else { 80 };
        let slash = if path.starts_with('/') { "" } else { "/" };
        if self.port == default_port {
            format!("{}://{}{}{}", self.scheme(), self.host, slash, path)
        } else {
            format!("{}://{}:{}{}{}", self.scheme(), self.host, self.port, slash, path)
        }
    }
}

/// Append an encoded query string to `url`, respecting an existing `?`.
pub fn with_query(url: String, query: &str) -> String {
    if query.is_empty() {
        url
    } else if url.contains('?') {
        format!("{url}&{query}")
    } else {
        format!("{url}?{query}")
    }
}
