//! Transport boundary types.
//!
//! A gateway (test harness, CGI shim, HTTP server adapter) hands the
//! framework an [`Environ`] describing one parsed request and receives a
//! [`Transmission`] back: status line, header list, a byte iterable, and
//! on the unhandled-error path the error itself as extra context. The
//! framework never touches a socket.

use std::io::Read;

use http::Method;

use crate::error::ErrorResponse;
use crate::response::BodyIter;

/// Transport-supplied file wrapping hook.
///
/// When set, [`crate::response::Response::finalize`] hands file bodies to
/// this function instead of the built-in chunked reader, letting the
/// transport substitute something like `sendfile`.
pub type FileWrapper = Box<dyn Fn(Box<dyn Read + Send>, usize) -> BodyIter + Send + Sync>;

/// One inbound request as parsed by the gateway.
///
/// Fields mirror the classic gateway interface contract: request line
/// pieces, URL reconstruction data, body metadata, the raw header
/// variables, and the body input stream.
pub struct Environ {
    /// HTTP method.
    pub method: Method,
    /// URL scheme, `"http"` or `"https"`.
    pub scheme: String,
    /// Raw request path (before normalization).
    pub path: String,
    /// Raw query string, without the leading `?`.
    pub query_string: String,
    /// Server host name.
    pub server_name: String,
    /// Server port.
    pub server_port: u16,
    /// Virtual root the application is mounted under.
    pub script_name: String,
    /// Content-Type of the request body, if any.
    pub content_type: Option<String>,
    /// Declared body length in bytes, if any.
    pub content_length: Option<usize>,
    /// Header variables in gateway convention (`HTTP_*` keys).
    pub gateway_vars: Vec<(String, String)>,
    /// Request body stream.
    pub input: Box<dyn Read + Send>,
    /// Optional transport file wrapper for file responses.
    pub file_wrapper: Option<FileWrapper>,
}

impl Environ {
    /// Create an environment with gateway defaults; callers fill in the
    /// rest field by field.
    #[must_use]
    pub fn new(method: Method, path: &str) -> Self {
        Self {
            method,
            scheme: "http".to_string(),
            path: path.to_string(),
            query_string: String::new(),
            server_name: "localhost".to_string(),
            server_port: 80,
            script_name: String::new(),
            content_type: None,
            content_length: None,
            gateway_vars: Vec::new(),
            input: Box::new(std::io::empty()),
            file_wrapper: None,
        }
    }
}

impl std::fmt::Debug for Environ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environ")
            .field("method", &self.method)
            .field("scheme", &self.scheme)
            .field("path", &self.path)
            .field("query_string", &self.query_string)
            .field("server_name", &self.server_name)
            .field("server_port", &self.server_port)
            .field("script_name", &self.script_name)
            .field("content_type", &self.content_type)
            .field("content_length", &self.content_length)
            .field("gateway_vars", &self.gateway_vars)
            .finish_non_exhaustive()
    }
}

/// Finalized response handed back to the transport.
#[derive(Debug)]
pub struct Transmission {
    /// Status line, e.g. `"404 Not Found"`.
    pub status: String,
    /// Ordered header list; names may repeat (`Set-Cookie`).
    pub headers: Vec<(String, String)>,
    /// Response body as a byte-chunk iterable.
    pub body: BodyIter,
    /// Error context, populated only when an error response reached the
    /// transport without a registered listener handling it.
    pub error: Option<ErrorResponse>,
}

impl Transmission {
    /// Find a header value by case-insensitive name (first match).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}
