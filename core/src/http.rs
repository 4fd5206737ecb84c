//! HTTP value types shared by both transports.
//!
//! # Design
//! Whichever backend performed the call, the caller gets the same
//! `ResponseEnvelope`: numeric status, raw body bytes, and the header list in
//! wire order. Fields are private so an envelope cannot change after a
//! transport hands it over.

use serde::de::DeserializeOwned;

/// The only two methods that ever reach the wire. Any other verb is tunnelled
/// through `Post` with a `method` parameter, see `policy::normalize_verb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

/// A completed HTTP response, identical in shape for every transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseEnvelope {
    status: u16,
    body: Vec<u8>,
    headers: Vec<(String, String)>,
}

impl ResponseEnvelope {
    pub fn new(status: u16, body: Vec<u8>, headers: Vec<(String, String)>) -> Self {
        Self {
            status,
            body,
            headers,
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// All headers in the order the server sent them. Repeated names appear
    /// once per value.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// First value of `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn header_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    pub fn into_parts(self) -> (u16, Vec<u8>, Vec<(String, String)>) {
        (self.status, self.body, self.headers)
    }
}

/// Flatten an `http::HeaderMap` into owned pairs. Values that are not valid
/// visible ASCII are decoded lossily rather than dropped.
pub(crate) fn collect_headers<'a, I>(headers: I) -> Vec<(String, String)>
where
    I: IntoIterator<Item = (&'a str, &'a [u8])>,
{
    headers
        .into_iter()
        .map(|(name, value)| (name.to_string(), String::from_utf8_lossy(value).into_owned()))
        .collect()
}
