//! The request object handed to handlers and middleware.
//!
//! Built once per dispatch from the transport [`Environ`]. Query and
//! form parameters are parsed eagerly; headers, cookies and JSON
//! bodies are derived on first access and memoized for the rest of the
//! request.

use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;

use http::Method;
use once_cell::unsync::OnceCell;
use serde_json::Value;
use tracing::warn;

use crate::config::Settings;
use crate::encoding::{parse_cookie_header, parse_query_string};
use crate::environ::{Environ, FileWrapper};
use crate::headers::HeaderMap;
use crate::multipart::{parse_boundary, parse_multipart, FilePart};
use crate::router::ParamVec;
use crate::response::Response;
use crate::session::Session;

/// Callback queued by a handler, run after the static after-hooks.
pub type ResponseCallback = Box<dyn FnOnce(&mut Request, &mut Response) + Send>;

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
const MULTIPART_FORM: &str = "multipart/form-data";

pub struct Request {
    method: Method,
    scheme: String,
    path: String,
    query_string: String,
    server_name: String,
    server_port: u16,
    script_name: String,
    content_type: Option<String>,
    content_length: Option<usize>,
    gateway_vars: Vec<(String, String)>,
    input: Option<Box<dyn Read + Send>>,
    file_wrapper: Option<FileWrapper>,
    settings: Arc<Settings>,

    query: HashMap<String, String>,
    form: HashMap<String, String>,
    files: Vec<FilePart>,
    headers: OnceCell<HeaderMap>,
    cookies: Option<HashMap<String, String>>,
    json_body: Option<Option<Value>>,
    callbacks: Vec<ResponseCallback>,

    /// Parameters captured by the matched route. Empty until the
    /// dispatcher resolves a table route.
    pub matchdict: ParamVec,
    /// Session state. Empty unless a session factory loaded it.
    pub session: Session,
}

impl Request {
    /// Normalize the environ and eagerly parse query and form bodies.
    ///
    /// Body parse failures leave the form empty; they are logged, not
    /// surfaced, matching the tolerant treatment of malformed input at
    /// the edge.
    #[must_use]
    pub fn new(env: Environ, settings: Arc<Settings>) -> Self {
        let path = normalize_path(&env.path);
        let query = if env.query_string.is_empty() {
            HashMap::new()
        } else {
            parse_query_string(&env.query_string)
        };

        let mut input: Option<Box<dyn Read + Send>> = Some(env.input);
        let mut form = HashMap::new();
        let mut files = Vec::new();

        if let Some(ct) = env.content_type.as_deref() {
            if ct.contains(FORM_URLENCODED) {
                match read_body(&mut input, env.content_length) {
                    Ok(body) => {
                        form = parse_query_string(&String::from_utf8_lossy(&body));
                    }
                    Err(e) => warn!(error = %e, "Failed to read urlencoded body"),
                }
            } else if ct.contains(MULTIPART_FORM) {
                match read_body(&mut input, env.content_length) {
                    Ok(body) => match parse_boundary(ct) {
                        Some(boundary) => match parse_multipart(&body, &boundary) {
                            Ok((fields, parts)) => {
                                form = fields.into_iter().collect();
                                files = parts;
                            }
                            Err(e) => warn!(error = %e, "Failed to parse multipart body"),
                        },
                        None => warn!(content_type = %ct, "Multipart body without boundary"),
                    },
                    Err(e) => warn!(error = %e, "Failed to read multipart body"),
                }
            }
        }

        Self {
            method: env.method,
            scheme: env.scheme,
            path,
            query_string: env.query_string,
            server_name: env.server_name,
            server_port: env.server_port,
            script_name: env.script_name,
            content_type: env.content_type,
            content_length: env.content_length,
            gateway_vars: env.gateway_vars,
            input,
            file_wrapper: env.file_wrapper,
            settings,
            query,
            form,
            files,
            headers: OnceCell::new(),
            cookies: None,
            json_body: None,
            callbacks: Vec::new(),
            matchdict: ParamVec::new(),
            session: Session::new(),
        }
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Normalized path: no trailing slash except for `/` itself.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn query_string(&self) -> &str {
        &self.query_string
    }

    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    #[must_use]
    pub fn content_length(&self) -> Option<usize> {
        self.content_length
    }

    /// Decoded query-string parameters, last occurrence winning.
    #[must_use]
    pub fn query(&self) -> &HashMap<String, String> {
        &self.query
    }

    /// Decoded form parameters from an urlencoded or multipart body.
    #[must_use]
    pub fn form(&self) -> &HashMap<String, String> {
        &self.form
    }

    /// Uploaded file parts from a multipart body.
    #[must_use]
    pub fn files(&self) -> &[FilePart] {
        &self.files
    }

    /// Request headers, derived from the gateway vars on first access.
    pub fn headers(&self) -> &HeaderMap {
        self.headers
            .get_or_init(|| HeaderMap::from_gateway_vars(&self.gateway_vars))
    }

    /// Request cookies, parsed from the `Cookie` header on first access.
    pub fn cookies(&mut self) -> &HashMap<String, String> {
        if self.cookies.is_none() {
            let parsed = self
                .headers()
                .get("Cookie")
                .map(parse_cookie_header)
                .unwrap_or_default();
            self.cookies = Some(parsed);
        }
        self.cookies.get_or_insert_with(HashMap::new)
    }

    /// A single cookie value by name.
    pub fn cookie(&mut self, name: &str) -> Option<String> {
        self.cookies().get(name).cloned()
    }

    /// Forget a cookie for the remainder of the request. Used when a
    /// cookie references state that no longer exists.
    pub fn remove_cookie(&mut self, name: &str) {
        let _ = self.cookies();
        if let Some(cookies) = &mut self.cookies {
            cookies.remove(name);
        }
    }

    /// Parse the request body as JSON. The result, including a parse
    /// failure, is memoized; repeated calls never re-read the stream.
    pub fn json(&mut self) -> Option<&Value> {
        if self.json_body.is_none() {
            let parsed = match read_body(&mut self.input, self.content_length) {
                Ok(body) if !body.is_empty() => match serde_json::from_slice(&body) {
                    Ok(value) => Some(value),
                    Err(e) => {
                        warn!(error = %e, "Failed to parse JSON body");
                        None
                    }
                },
                Ok(_) => None,
                Err(e) => {
                    warn!(error = %e, "Failed to read request body");
                    None
                }
            };
            self.json_body = Some(parsed);
        }
        self.json_body.as_ref().and_then(Option::as_ref)
    }

    /// A captured route parameter, last occurrence winning.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.matchdict
            .iter()
            .rfind(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Queue a callback to run after the static after-hooks, in
    /// enqueue order.
    pub fn add_response_callback(
        &mut self,
        cb: impl FnOnce(&mut Request, &mut Response) + Send + 'static,
    ) {
        self.callbacks.push(Box::new(cb));
    }

    /// Drain the queued callbacks for execution.
    pub fn take_callbacks(&mut self) -> Vec<ResponseCallback> {
        std::mem::take(&mut self.callbacks)
    }

    /// Take the transport's sendfile hook, if it supplied one.
    pub fn take_file_wrapper(&mut self) -> Option<FileWrapper> {
        self.file_wrapper.take()
    }

    /// Server authority: the `Host` header when present, otherwise
    /// `server_name:port`.
    #[must_use]
    pub fn server(&self) -> String {
        match self.headers().get("Host") {
            Some(host) => host.to_string(),
            None => format!("{}:{}", self.server_name, self.server_port),
        }
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.server_port
    }

    /// The script's virtual root.
    #[must_use]
    pub fn location(&self) -> &str {
        &self.script_name
    }

    /// Build an absolute URL for a path under this application.
    #[must_use]
    pub fn get_url(&self, path: &str) -> String {
        format!(
            "{}://{}{}{}",
            self.scheme,
            self.server(),
            self.script_name,
            path
        )
    }
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("query_string", &self.query_string)
            .field("content_type", &self.content_type)
            .field("matchdict", &self.matchdict)
            .finish_non_exhaustive()
    }
}

fn normalize_path(raw: &str) -> String {
    if raw.is_empty() {
        return "/".to_string();
    }
    if raw.len() > 1 {
        if let Some(stripped) = raw.strip_suffix('/') {
            return stripped.to_string();
        }
    }
    raw.to_string()
}

fn read_body(
    input: &mut Option<Box<dyn Read + Send>>,
    content_length: Option<usize>,
) -> std::io::Result<Vec<u8>> {
    let Some(mut stream) = input.take() else {
        return Ok(Vec::new());
    };
    let mut body = Vec::new();
    match content_length {
        Some(len) => {
            body.resize(len, 0);
            stream.read_exact(&mut body)?;
        }
        None => {
            stream.read_to_end(&mut body)?;
        }
    }
    Ok(body)
}
