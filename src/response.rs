//! Mutable response container and finalization.
//!
//! A [`Response`] accumulates status, ordered headers, and either an
//! in-memory body or a file handle. [`Response::finalize`] consumes it
//! exactly once, computing Content-Length and producing the [`BodyIter`]
//! the transport drains.

use std::io::Read;

use http::StatusCode;

use crate::environ::FileWrapper;

/// Block size for the fallback file reader.
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

/// Transport-ready byte iterable produced by [`Response::finalize`].
///
/// Yields `io::Result<Vec<u8>>` chunks: a single chunk for in-memory
/// bodies, fixed-size blocks for file bodies, or whatever a transport
/// [`FileWrapper`] produced.
pub enum BodyIter {
    /// No body.
    Empty,
    /// One in-memory chunk.
    Single(Option<Vec<u8>>),
    /// Fallback file reader, yielding `chunk_size` blocks until an
    /// empty read.
    File {
        reader: Option<Box<dyn Read + Send>>,
        chunk_size: usize,
    },
    /// Iterable supplied by a transport file wrapper.
    Wrapped(Box<dyn Iterator<Item = std::io::Result<Vec<u8>>> + Send>),
}

impl Iterator for BodyIter {
    type Item = std::io::Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            BodyIter::Empty => None,
            BodyIter::Single(chunk) => chunk.take().map(Ok),
            BodyIter::File { reader, chunk_size } => {
                let r = reader.as_mut()?;
                let mut buf = vec![0u8; *chunk_size];
                match r.read(&mut buf) {
                    Ok(0) => {
                        *reader = None;
                        None
                    }
                    Ok(n) => {
                        buf.truncate(n);
                        Some(Ok(buf))
                    }
                    Err(err) => {
                        *reader = None;
                        Some(Err(err))
                    }
                }
            }
            BodyIter::Wrapped(inner) => inner.next(),
        }
    }
}

impl std::fmt::Debug for BodyIter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BodyIter::Empty => write!(f, "BodyIter::Empty"),
            BodyIter::Single(chunk) => write!(
                f,
                "BodyIter::Single({} bytes)",
                chunk.as_ref().map(Vec::len).unwrap_or(0)
            ),
            BodyIter::File { chunk_size, .. } => {
                write!(f, "BodyIter::File(chunk_size={chunk_size})")
            }
            BodyIter::Wrapped(_) => write!(f, "BodyIter::Wrapped"),
        }
    }
}

/// Mutable response under construction.
///
/// Headers are an ordered list and may repeat (`Set-Cookie`). Body and
/// file are mutually exclusive; setting one clears the other.
pub struct Response {
    status: StatusCode,
    headers: Vec<(String, String)>,
    body: Option<Vec<u8>>,
    file: Option<Box<dyn Read + Send>>,
    file_len: Option<u64>,
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    /// A fresh `200 OK` response with no headers or body.
    #[must_use]
    pub fn new() -> Self {
        Self::with_status(StatusCode::OK)
    }

    /// A fresh response with the given status.
    #[must_use]
    pub fn with_status(status: StatusCode) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: None,
            file: None,
            file_len: None,
        }
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// Status line in transport form, e.g. `"404 Not Found"`.
    #[must_use]
    pub fn status_line(&self) -> String {
        format!(
            "{} {}",
            self.status.as_u16(),
            self.status.canonical_reason().unwrap_or("Unknown")
        )
    }

    /// Add or replace a header (case-insensitive on the name).
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.into()));
    }

    /// Append a header without touching existing entries of the same
    /// name. Used for multi-valued headers such as `Set-Cookie`.
    pub fn add_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.push((name.to_string(), value.into()));
    }

    /// First header value matching the name, case-insensitive.
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Append a `Set-Cookie` header. `max_age` of `Some(0)` expires the
    /// cookie immediately.
    pub fn set_cookie(&mut self, name: &str, value: &str, max_age: Option<u64>) {
        let mut cookie = format!("{name}={value}");
        if let Some(age) = max_age {
            cookie.push_str(&format!("; Max-Age={age}"));
        }
        cookie.push_str("; Path=/");
        self.add_header("Set-Cookie", cookie);
    }

    /// Set an in-memory body, clearing any file.
    pub fn set_body(&mut self, body: impl Into<Vec<u8>>) {
        self.body = Some(body.into());
        self.file = None;
        self.file_len = None;
    }

    #[must_use]
    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    /// Set a file body with an optionally declared length, clearing any
    /// in-memory body.
    pub fn set_file(&mut self, file: Box<dyn Read + Send>, len: Option<u64>) {
        self.file = Some(file);
        self.file_len = len;
        self.body = None;
    }

    #[must_use]
    pub fn has_file(&self) -> bool {
        self.file.is_some()
    }

    /// Finalize into `(status line, headers, body iterable)`.
    ///
    /// Consuming `self` makes the exactly-once contract structural: a
    /// finalized response cannot be finalized (or mutated) again.
    /// In-memory bodies get a Content-Length equal to their byte length;
    /// file bodies get one only when a length was declared, and are
    /// wrapped by the transport `file_wrapper` when provided.
    #[must_use]
    pub fn finalize(
        mut self,
        file_wrapper: Option<&FileWrapper>,
    ) -> (String, Vec<(String, String)>, BodyIter) {
        let body = if let Some(body) = self.body.take() {
            self.set_header("Content-Length", body.len().to_string());
            BodyIter::Single(Some(body))
        } else if let Some(file) = self.file.take() {
            if let Some(len) = self.file_len {
                self.set_header("Content-Length", len.to_string());
            }
            match file_wrapper {
                Some(wrap) => wrap(file, DEFAULT_CHUNK_SIZE),
                None => BodyIter::File {
                    reader: Some(file),
                    chunk_size: DEFAULT_CHUNK_SIZE,
                },
            }
        } else {
            BodyIter::Empty
        };
        (self.status_line(), self.headers, body)
    }
}

impl std::fmt::Debug for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body_len", &self.body.as_ref().map(Vec::len))
            .field("has_file", &self.file.is_some())
            .field("file_len", &self.file_len)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn drain(body: BodyIter) -> Vec<u8> {
        body.map(|chunk| chunk.unwrap()).flatten().collect()
    }

    #[test]
    fn test_finalize_body_sets_content_length() {
        let mut resp = Response::new();
        resp.set_body("h\u{00e9}llo");
        let (status, headers, body) = resp.finalize(None);
        assert_eq!(status, "200 OK");
        let len = headers
            .iter()
            .find(|(k, _)| k == "Content-Length")
            .map(|(_, v)| v.clone())
            .unwrap();
        let bytes = drain(body);
        assert_eq!(len, bytes.len().to_string());
        assert_eq!(bytes, "h\u{00e9}llo".as_bytes());
    }

    #[test]
    fn test_finalize_empty_response() {
        let resp = Response::new();
        let (_, headers, mut body) = resp.finalize(None);
        assert!(headers.iter().all(|(k, _)| k != "Content-Length"));
        assert!(body.next().is_none());
    }

    #[test]
    fn test_finalize_file_chunks_until_empty_read() {
        let data = vec![7u8; DEFAULT_CHUNK_SIZE + 100];
        let mut resp = Response::new();
        resp.set_file(Box::new(Cursor::new(data.clone())), Some(data.len() as u64));
        let (_, headers, body) = resp.finalize(None);
        assert!(headers
            .iter()
            .any(|(k, v)| k == "Content-Length" && v == &data.len().to_string()));
        let chunks: Vec<Vec<u8>> = body.map(|c| c.unwrap()).collect();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].len(), DEFAULT_CHUNK_SIZE);
        assert_eq!(chunks[1].len(), 100);
    }

    #[test]
    fn test_finalize_file_without_length_omits_content_length() {
        let mut resp = Response::new();
        resp.set_file(Box::new(Cursor::new(b"abc".to_vec())), None);
        let (_, headers, body) = resp.finalize(None);
        assert!(headers.iter().all(|(k, _)| k != "Content-Length"));
        assert_eq!(drain(body), b"abc");
    }

    #[test]
    fn test_finalize_prefers_transport_wrapper() {
        let wrapper: FileWrapper =
            Box::new(|_file, _chunk| BodyIter::Single(Some(b"wrapped".to_vec())));
        let mut resp = Response::new();
        resp.set_file(Box::new(Cursor::new(b"original".to_vec())), None);
        let (_, _, body) = resp.finalize(Some(&wrapper));
        assert_eq!(drain(body), b"wrapped");
    }

    #[test]
    fn test_body_and_file_mutually_exclusive() {
        let mut resp = Response::new();
        resp.set_file(Box::new(Cursor::new(b"file".to_vec())), Some(4));
        resp.set_body("body");
        assert!(!resp.has_file());
        assert_eq!(resp.body(), Some(b"body".as_ref()));
    }

    #[test]
    fn test_set_header_replaces_add_header_appends() {
        let mut resp = Response::new();
        resp.set_header("X-Test", "one");
        resp.set_header("x-test", "two");
        resp.set_cookie("a", "1", None);
        resp.set_cookie("b", "2", Some(60));
        assert_eq!(resp.get_header("X-Test"), Some("two"));
        let cookies: Vec<&str> = resp
            .headers()
            .iter()
            .filter(|(k, _)| k == "Set-Cookie")
            .map(|(_, v)| v.as_str())
            .collect();
        assert_eq!(cookies, vec!["a=1; Path=/", "b=2; Max-Age=60; Path=/"]);
    }
}
