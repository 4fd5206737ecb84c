//! Parameter policy shared by both transports.
//!
//! # Design
//! Stateless free functions. A transport asks `requires_multipart` before
//! every send, then encodes either with `encode_query_params` (query string
//! or urlencoded body) or with `encode_multipart_params`.
//!
//! A JSON object shaped like a file descriptor (`content_type` and `path`,
//! no `file`) is accepted as a path-backed upload. Anything that only nearly
//! matches is sent as an ordinary JSON value with a warning and no error.

use std::collections::VecDeque;
use std::fmt::Write as _;
use std::fs::File;
use std::io::{self, Cursor, Read};

use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use crate::types::{FileDescriptor, FileSource, ParamValue, Params};

/// True iff any value in `params` is a valid file descriptor.
pub fn requires_multipart(params: &Params) -> bool {
    params.iter().any(|(_, value)| is_valid_file_descriptor(value))
}

/// True iff `value` can be uploaded as a file part.
pub fn is_valid_file_descriptor(value: &ParamValue) -> bool {
    match value {
        ParamValue::File(_) => true,
        ParamValue::Json(json) => json_file_path(json).is_some(),
        ParamValue::Text(_) => false,
    }
}

/// `(path, content_type)` of a JSON object with the file descriptor shape.
/// A `file` key disqualifies it: JSON cannot carry a readable stream.
fn json_file_path(json: &Value) -> Option<(&str, &str)> {
    let obj = json.as_object()?;
    if obj.contains_key("file") {
        return None;
    }
    let path = obj.get("path")?.as_str()?;
    let content_type = obj.get("content_type")?.as_str()?;
    Some((path, content_type))
}

fn warn_if_near_miss(key: &str, value: &ParamValue) {
    if let ParamValue::Json(Value::Object(obj)) = value {
        let file_like = ["path", "content_type", "file"].iter().any(|k| obj.contains_key(*k));
        if file_like && !is_valid_file_descriptor(value) {
            warn!(param = key, "file-like parameter is not a valid file descriptor, sending it as a plain value");
        }
    }
}

/// Text form of a non-file value. Strings go out verbatim, everything else
/// as JSON text.
fn value_text(value: &ParamValue) -> String {
    match value {
        ParamValue::Text(s) => s.clone(),
        ParamValue::Json(Value::String(s)) => s.clone(),
        ParamValue::Json(other) => other.to_string(),
        ParamValue::File(file) => file.path.clone(),
    }
}

/// `k1=v1&k2=v2` with every key and value percent-escaped. `None` and an
/// empty map both give an empty string.
pub fn encode_query_params(params: Option<&Params>) -> String {
    let Some(params) = params else {
        return String::new();
    };
    let mut out = String::new();
    for (key, value) in params.iter() {
        warn_if_near_miss(key, value);
        if !out.is_empty() {
            out.push('&');
        }
        let _ = write!(
            out,
            "{}={}",
            urlencoding::encode(key),
            urlencoding::encode(&value_text(value))
        );
    }
    out
}

/// Turn `params` into a multipart form. Valid file descriptors become file
/// parts (opened from disk when they carry no stream), the rest become text
/// fields.
pub fn encode_multipart_params(params: Params) -> io::Result<MultipartForm> {
    let mut form = MultipartForm::new();
    for (key, value) in params {
        warn_if_near_miss(&key, &value);
        match value {
            ParamValue::File(file) => form.add_file(key, file)?,
            ParamValue::Json(json) => match json_file_path(&json) {
                Some((path, content_type)) => {
                    form.add_file(key, FileDescriptor::from_path(path, content_type))?
                }
                None => form.add_text(key, value_text(&ParamValue::Json(json))),
            },
            text @ ParamValue::Text(_) => form.add_text(key, value_text(&text)),
        }
    }
    Ok(form)
}

enum PartBody {
    Text(String),
    File {
        file_name: String,
        content_type: String,
        reader: Box<dyn Read + Send>,
    },
}

struct Part {
    name: String,
    body: PartBody,
}

/// A `multipart/form-data` body whose file parts are read lazily.
pub struct MultipartForm {
    boundary: String,
    parts: Vec<Part>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self {
            boundary: format!("------------------------{}", Uuid::new_v4().simple()),
            parts: Vec::new(),
        }
    }

    pub fn add_text(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.parts.push(Part {
            name: name.into(),
            body: PartBody::Text(value.into()),
        });
    }

    /// Add a file part. A path-backed descriptor is opened here so a missing
    /// file fails before any bytes are sent.
    pub fn add_file(&mut self, name: impl Into<String>, file: FileDescriptor) -> io::Result<()> {
        let file_name = file.file_name().to_string();
        let reader: Box<dyn Read + Send> = match file.source {
            FileSource::Stream(stream) => stream,
            FileSource::Path => Box::new(File::open(&file.path)?),
        };
        self.parts.push(Part {
            name: name.into(),
            body: PartBody::File {
                file_name,
                content_type: file.content_type,
                reader,
            },
        });
        Ok(())
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Value for the request's `Content-Type` header.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.parts.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn file_field_names(&self) -> Vec<&str> {
        self.parts
            .iter()
            .filter(|p| matches!(p.body, PartBody::File { .. }))
            .map(|p| p.name.as_str())
            .collect()
    }

    /// Encoded body as a stream. File content is pulled from each part's
    /// reader as the body is consumed.
    pub fn into_reader(self) -> MultipartReader {
        let mut segments: VecDeque<Box<dyn Read + Send>> = VecDeque::new();
        for part in self.parts {
            let mut head = format!("--{}\r\n", self.boundary);
            match part.body {
                PartBody::Text(value) => {
                    let _ = write!(
                        head,
                        "Content-Disposition: form-data; name=\"{}\"\r\n\r\n",
                        escape_quoted(&part.name)
                    );
                    head.push_str(&value);
                    head.push_str("\r\n");
                    segments.push_back(Box::new(Cursor::new(head.into_bytes())));
                }
                PartBody::File {
                    file_name,
                    content_type,
                    reader,
                } => {
                    let _ = write!(
                        head,
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                        escape_quoted(&part.name),
                        escape_quoted(&file_name),
                        content_type
                    );
                    segments.push_back(Box::new(Cursor::new(head.into_bytes())));
                    segments.push_back(reader);
                    segments.push_back(Box::new(Cursor::new(b"\r\n".to_vec())));
                }
            }
        }
        segments.push_back(Box::new(Cursor::new(
            format!("--{}--\r\n", self.boundary).into_bytes(),
        )));
        MultipartReader { segments }
    }
}

impl Default for MultipartForm {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MultipartForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultipartForm")
            .field("boundary", &self.boundary)
            .field("fields", &self.field_names())
            .finish()
    }
}

fn escape_quoted(s: &str) -> String {
    s.replace('"', "%22").replace('\r', "%0D").replace('\n', "%0A")
}

/// Streaming reader over an encoded multipart body.
pub struct MultipartReader {
    segments: VecDeque<Box<dyn Read + Send>>,
}

impl Read for MultipartReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        while let Some(front) = self.segments.front_mut() {
            let n = front.read(buf)?;
            if n > 0 {
                return Ok(n);
            }
            self.segments.pop_front();
        }
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body_of(form: MultipartForm) -> String {
        let mut out = String::new();
        form.into_reader().read_to_string(&mut out).unwrap();
        out
    }

    #[test]
    fn plain_params_do_not_require_multipart() {
        let params = Params::new()
            .with("q", "rust")
            .with("limit", 10i64)
            .with("filter", json!({"kind": "page"}));
        assert!(!requires_multipart(&params));
        assert!(!requires_multipart(&Params::new()));
    }

    #[test]
    fn file_descriptor_requires_multipart() {
        let params = Params::new()
            .with("message", "hi")
            .with("source", FileDescriptor::from_path("/tmp/a.png", "image/png"));
        assert!(requires_multipart(&params));
    }

    #[test]
    fn file_shaped_json_object_is_a_file_descriptor() {
        let value = ParamValue::Json(json!({"content_type": "image/png", "path": "/tmp/a.png"}));
        assert!(is_valid_file_descriptor(&value));
    }

    #[test]
    fn near_miss_json_objects_are_plain_values() {
        let missing_type = ParamValue::Json(json!({"path": "/tmp/a.png"}));
        let missing_path = ParamValue::Json(json!({"content_type": "image/png"}));
        let with_file = ParamValue::Json(json!({"content_type": "image/png", "path": "a", "file": "x"}));
        let non_string = ParamValue::Json(json!({"content_type": "image/png", "path": 5}));
        for value in [missing_type, missing_path, with_file, non_string] {
            assert!(!is_valid_file_descriptor(&value), "{value:?}");
        }
        assert!(!is_valid_file_descriptor(&ParamValue::Text("path".into())));
    }

    #[test]
    fn empty_or_missing_params_encode_to_empty_string() {
        assert_eq!(encode_query_params(None), "");
        assert_eq!(encode_query_params(Some(&Params::new())), "");
    }

    #[test]
    fn spaces_are_percent_encoded() {
        let params = Params::new().with("a", "b c");
        assert_eq!(encode_query_params(Some(&params)), "a=b%20c");
    }

    #[test]
    fn non_string_values_are_json_encoded() {
        let params = Params::new().with("n", 5i64);
        assert_eq!(encode_query_params(Some(&params)), "n=5");

        let params = Params::new().with("ids", json!([1, 2]));
        assert_eq!(encode_query_params(Some(&params)), "ids=%5B1%2C2%5D");

        let params = Params::new().with("s", json!("plain"));
        assert_eq!(encode_query_params(Some(&params)), "s=plain");
    }

    #[test]
    fn pairs_are_joined_with_ampersand() {
        let params = Params::new().with("b", "2").with("a", "1").with("k y", "v&w");
        assert_eq!(encode_query_params(Some(&params)), "a=1&b=2&k%20y=v%26w");
    }

    #[test]
    fn encoding_twice_gives_the_same_output() {
        let params = Params::new().with("x", "1").with("y", json!({"z": true}));
        assert_eq!(
            encode_query_params(Some(&params)),
            encode_query_params(Some(&params))
        );
    }

    #[test]
    fn multipart_stream_part_uses_declared_name_and_type() {
        let params = Params::new().with("message", "hello").with(
            "source",
            FileDescriptor::from_stream(Cursor::new(b"PNGDATA".to_vec()), "dir/photo.png", "image/png"),
        );
        let form = encode_multipart_params(params).unwrap();
        assert_eq!(form.field_names(), vec!["message", "source"]);
        assert_eq!(form.file_field_names(), vec!["source"]);

        let boundary = form.boundary().to_string();
        assert_eq!(form.content_type(), format!("multipart/form-data; boundary={boundary}"));

        let body = body_of(form);
        assert!(body.starts_with(&format!("--{boundary}\r\n")));
        assert!(body.contains("Content-Disposition: form-data; name=\"message\"\r\n\r\nhello\r\n"));
        assert!(body.contains(
            "Content-Disposition: form-data; name=\"source\"; filename=\"photo.png\"\r\nContent-Type: image/png\r\n\r\nPNGDATA\r\n"
        ));
        assert!(body.ends_with(&format!("--{boundary}--\r\n")));
    }

    #[test]
    fn multipart_path_part_reads_the_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"from disk").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let params = Params::new().with("upload", FileDescriptor::from_path(path, "text/plain"));
        let body = body_of(encode_multipart_params(params).unwrap());
        assert!(body.contains("Content-Type: text/plain\r\n\r\nfrom disk\r\n"));
    }

    #[test]
    fn multipart_accepts_file_shaped_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"json shaped").unwrap();
        let path = file.path().to_str().unwrap();

        let params = Params::new().with("upload", json!({"content_type": "text/plain", "path": path}));
        let form = encode_multipart_params(params).unwrap();
        assert_eq!(form.file_field_names(), vec!["upload"]);
        assert!(body_of(form).contains("json shaped"));
    }

    #[test]
    fn multipart_structured_fields_are_json_text() {
        let params = Params::new()
            .with("meta", json!({"a": 1}))
            .with("near", json!({"path": "/nope"}));
        let form = encode_multipart_params(params).unwrap();
        assert!(form.file_field_names().is_empty());
        let body = body_of(form);
        assert!(body.contains("name=\"meta\"\r\n\r\n{\"a\":1}\r\n"));
        assert!(body.contains("name=\"near\"\r\n\r\n{\"path\":\"/nope\"}\r\n"));
    }

    #[test]
    fn multipart_mixes_json_files_and_json_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"attached").unwrap();
        let path = file.path().to_str().unwrap();

        let params = Params::new()
            .with("attachment", json!({"content_type": "text/plain", "path": path}))
            .with("tags", json!(["a", "b"]))
            .with("title", "plain");
        let form = encode_multipart_params(params).unwrap();
        assert_eq!(form.field_names(), vec!["attachment", "tags", "title"]);
        assert_eq!(form.file_field_names(), vec!["attachment"]);
        let body = body_of(form);
        assert!(body.contains("Content-Type: text/plain\r\n\r\nattached\r\n"));
        assert!(body.contains("name=\"tags\"\r\n\r\n[\"a\",\"b\"]\r\n"));
        assert!(body.contains("name=\"title\"\r\n\r\nplain\r\n"));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let params = Params::new().with(
            "upload",
            FileDescriptor::from_path("/definitely/not/here.bin", "application/octet-stream"),
        );
        let err = encode_multipart_params(params).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn multipart_field_names_are_stable() {
        let build = || {
            Params::new()
                .with("b", "1")
                .with("a", FileDescriptor::from_stream(Cursor::new(Vec::new()), "f", "text/plain"))
        };
        let first = encode_multipart_params(build()).unwrap();
        let second = encode_multipart_params(build()).unwrap();
        assert_eq!(first.field_names(), second.field_names());
        assert_ne!(first.boundary(), second.boundary());
    }

    #[test]
    fn quotes_in_names_are_escaped() {
        let mut form = MultipartForm::new();
        form.add_text("we\"ird", "v");
        assert!(body_of(form).contains("name=\"we%22ird\""));
    }
}
