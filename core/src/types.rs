//! Request inputs: parameters, file descriptors and per-call options.
//!
//! # Design
//! A parameter value is a closed sum type. Plain text goes out verbatim,
//! structured values are JSON-encoded, and files are explicit descriptors
//! backed either by a path or by an already-open stream. `Params` keeps keys
//! sorted so encoding the same map twice gives the same output.

use std::collections::BTreeMap;
use std::fmt;
use std::io::Read;
use std::time::Duration;

/// A single request parameter value.
#[derive(Debug)]
pub enum ParamValue {
    Text(String),
    Json(serde_json::Value),
    File(FileDescriptor),
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Json(value.into())
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Json(value.into())
    }
}

impl From<serde_json::Value> for ParamValue {
    fn from(value: serde_json::Value) -> Self {
        ParamValue::Json(value)
    }
}

impl From<FileDescriptor> for ParamValue {
    fn from(value: FileDescriptor) -> Self {
        ParamValue::File(value)
    }
}

/// Where the bytes of a file part come from.
pub enum FileSource {
    /// Open `FileDescriptor::path` from the local filesystem at send time.
    Path,
    /// Read sequentially from an open stream. Single use.
    Stream(Box<dyn Read + Send>),
}

impl fmt::Debug for FileSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileSource::Path => f.write_str("Path"),
            FileSource::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// A file to upload as a multipart part.
///
/// `path` is always the filename reported in the part metadata, even when
/// the content comes from a stream.
#[derive(Debug)]
pub struct FileDescriptor {
    pub content_type: String,
    pub path: String,
    pub source: FileSource,
}

impl FileDescriptor {
    pub fn from_path(path: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
            path: path.into(),
            source: FileSource::Path,
        }
    }

    pub fn from_stream(
        stream: impl Read + Send + 'static,
        path: impl Into<String>,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            content_type: content_type.into(),
            path: path.into(),
            source: FileSource::Stream(Box::new(stream)),
        }
    }

    /// Base name of `path`, used as the multipart filename.
    pub fn file_name(&self) -> &str {
        self.path
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(self.path.as_str())
    }
}

/// Request parameters, iterated in key order.
#[derive(Debug, Default)]
pub struct Params {
    entries: BTreeMap<String, ParamValue>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or replace `key`, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Option<ParamValue> {
        self.entries.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl IntoIterator for Params {
    type Item = (String, ParamValue);
    type IntoIter = std::collections::btree_map::IntoIter<String, ParamValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<K, V> FromIterator<(K, V)> for Params
where
    K: Into<String>,
    V: Into<ParamValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}

/// Per-call options recognised by both transports.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Send to the REST host instead of the Graph host.
    pub rest_api: bool,
    /// Force a secure connection for this call.
    pub use_ssl: bool,
    /// Passthrough overrides for the engine transport. Ignored by the socket
    /// transport.
    pub engine: EngineOptions,
}

impl RequestOptions {
    pub fn rest_api() -> Self {
        Self {
            rest_api: true,
            ..Self::default()
        }
    }

    pub fn use_ssl() -> Self {
        Self {
            use_ssl: true,
            ..Self::default()
        }
    }
}

/// Engine-specific overrides merged over the request defaults.
#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    /// Replaces the request parameters entirely when set.
    pub params: Option<Vec<(String, String)>>,
    /// Extra headers sent with the request.
    pub headers: Vec<(String, String)>,
    /// Overrides the configured timeout for this request.
    pub timeout: Option<Duration>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn params_iterate_in_key_order() {
        let params = Params::new().with("b", "2").with("a", "1").with("c", 3i64);
        let keys: Vec<&str> = params.keys().collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[test]
    fn insert_replaces_existing_key() {
        let mut params = Params::new().with("a", "1");
        let previous = params.insert("a", "2");
        assert!(matches!(previous, Some(ParamValue::Text(ref s)) if s == "1"));
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn conversions_pick_the_right_variant() {
        assert!(matches!(ParamValue::from("x"), ParamValue::Text(_)));
        assert!(matches!(ParamValue::from(5i64), ParamValue::Json(_)));
        assert!(matches!(ParamValue::from(true), ParamValue::Json(_)));
        let file = FileDescriptor::from_path("/tmp/a.png", "image/png");
        assert!(matches!(ParamValue::from(file), ParamValue::File(_)));
    }

    #[test]
    fn file_name_strips_directories() {
        let file = FileDescriptor::from_path("/var/uploads/photo.jpg", "image/jpeg");
        assert_eq!(file.file_name(), "photo.jpg");
        let file = FileDescriptor::from_stream(Cursor::new(Vec::new()), "plain.txt", "text/plain");
        assert_eq!(file.file_name(), "plain.txt");
    }

    #[test]
    fn params_collect_from_pairs() {
        let params: Params = vec![("q", "rust"), ("limit", "10")].into_iter().collect();
        assert_eq!(params.len(), 2);
        assert!(params.contains_key("q"));
    }

    #[test]
    fn request_option_shortcuts() {
        assert!(RequestOptions::rest_api().rest_api);
        assert!(!RequestOptions::rest_api().use_ssl);
        assert!(RequestOptions::use_ssl().use_ssl);
    }
}
