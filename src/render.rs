//! Render strategies.
//!
//! A handler that returns [`Action::Render`](crate::dispatcher::Action)
//! names a render key and hands over a JSON value; the registry turns
//! the pair into a response body. Keys that look like template file
//! names go through minijinja under the configured document root,
//! everything else is looked up among the named renderers.

use std::collections::HashMap;
use std::sync::Arc;

use minijinja::Environment;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, error};

use crate::config::Settings;
use crate::dispatcher::{Action, Handler, HandlerResult};
use crate::error::ErrorResponse;
use crate::request::Request;
use crate::response::Response;

// Literal pattern, compiles unconditionally.
#[allow(clippy::expect_used)]
static TEMPLATE_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.(html|j2|jinja)$").expect("Failed to compile template key regex"));

/// A named render strategy.
pub trait Renderer: Send + Sync {
    /// Serialize `data` into a body string, setting content-type headers
    /// on `resp` as a side effect.
    fn render(
        &self,
        data: &Value,
        req: &Request,
        resp: &mut Response,
    ) -> Result<String, ErrorResponse>;
}

/// Default renderer: serializes JSON objects and arrays.
#[derive(Default)]
pub struct JsonRenderer {
    /// Pretty-print the output. Off by default.
    pub pretty: bool,
}

impl Renderer for JsonRenderer {
    fn render(
        &self,
        data: &Value,
        _req: &Request,
        resp: &mut Response,
    ) -> Result<String, ErrorResponse> {
        match data {
            Value::Object(_) | Value::Array(_) => {
                resp.set_header("Content-Type", "application/json");
                let body = if self.pretty {
                    serde_json::to_string_pretty(data)
                } else {
                    serde_json::to_string(data)
                };
                body.map_err(|e| {
                    ErrorResponse::internal_server_error()
                        .with_description(format!("JSON serialization failed: {e}"))
                })
            }
            other => Err(ErrorResponse::internal_server_error()
                .with_description(format!("Value is not JSON serializable: {other}"))),
        }
    }
}

/// Per-application registry of render strategies.
///
/// Owned by the application instance; populated during setup and
/// read-only while serving.
pub struct RenderRegistry {
    env: Environment<'static>,
    renderers: HashMap<String, Box<dyn Renderer>>,
}

impl RenderRegistry {
    /// Build a registry with the `"json"` renderer preinstalled and the
    /// template loader rooted at `settings.document_root` when set.
    #[must_use]
    pub fn new(settings: &Settings) -> Self {
        let mut env = Environment::new();
        if let Some(root) = &settings.document_root {
            env.set_loader(minijinja::path_loader(root));
        }
        let mut renderers: HashMap<String, Box<dyn Renderer>> = HashMap::new();
        renderers.insert("json".to_string(), Box::new(JsonRenderer::default()));
        Self { env, renderers }
    }

    /// Install a named renderer, replacing any previous one under the
    /// same key.
    pub fn add(&mut self, key: &str, renderer: impl Renderer + 'static) {
        self.renderers.insert(key.to_string(), Box::new(renderer));
    }

    /// Resolve a render key and produce the body string.
    ///
    /// Keys ending in `.html`, `.j2` or `.jinja` are template file
    /// names relative to the document root and render with
    /// `Content-Type: text/html`. Other keys select a named renderer.
    /// Unknown keys, missing templates and template failures all map
    /// to InternalServerError.
    pub fn render(
        &self,
        key: &str,
        data: &Value,
        req: &Request,
        resp: &mut Response,
    ) -> Result<String, ErrorResponse> {
        if TEMPLATE_KEY.is_match(key) {
            return self.render_template(key, data, resp);
        }
        match self.renderers.get(key) {
            Some(renderer) => {
                debug!(render_key = %key, "Named renderer selected");
                renderer.render(data, req, resp)
            }
            None => {
                error!(render_key = %key, "No renderer registered for key");
                Err(ErrorResponse::internal_server_error()
                    .with_description(format!("No renderer registered for '{key}'")))
            }
        }
    }

    fn render_template(
        &self,
        name: &str,
        data: &Value,
        resp: &mut Response,
    ) -> Result<String, ErrorResponse> {
        let template = self.env.get_template(name).map_err(|e| {
            error!(template = %name, error = %e, "Template not found");
            ErrorResponse::internal_server_error()
                .with_description(format!("Template '{name}' could not be loaded: {e}"))
        })?;
        let body = template.render(data).map_err(|e| {
            error!(template = %name, error = %e, "Template render failed");
            ErrorResponse::internal_server_error()
                .with_description(format!("Template '{name}' failed to render: {e}"))
        })?;
        resp.set_header("Content-Type", "text/html");
        debug!(template = %name, bytes = body.len(), "Template rendered");
        Ok(body)
    }
}

/// Wrap a data-producing closure as a handler that renders through the
/// given key.
pub fn rendered<F>(template: &str, f: F) -> Handler
where
    F: Fn(&mut Request, &mut Response) -> Result<Value, ErrorResponse> + Send + Sync + 'static,
{
    let template = template.to_string();
    Arc::new(move |req: &mut Request, resp: &mut Response| -> HandlerResult {
        let data = f(req, resp)?;
        Ok(Action::Render {
            template: template.clone(),
            data,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environ::Environ;
    use serde_json::json;

    fn fixtures() -> (Request, Response) {
        let req = Request::new(
            Environ::new(http::Method::GET, "/"),
            Arc::new(Settings::default()),
        );
        (req, Response::new())
    }

    #[test]
    fn test_json_renderer_object() {
        let (req, mut resp) = fixtures();
        let body = JsonRenderer::default()
            .render(&json!({"a": 1}), &req, &mut resp)
            .unwrap();
        assert_eq!(body, r#"{"a":1}"#);
        assert_eq!(resp.get_header("Content-Type"), Some("application/json"));
    }

    #[test]
    fn test_json_renderer_rejects_scalars() {
        let (req, mut resp) = fixtures();
        let err = JsonRenderer::default()
            .render(&json!("bare string"), &req, &mut resp)
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InternalServerError);
    }

    #[test]
    fn test_registry_defaults_to_json() {
        let (req, mut resp) = fixtures();
        let registry = RenderRegistry::new(&Settings::default());
        let body = registry
            .render("json", &json!([1, 2]), &req, &mut resp)
            .unwrap();
        assert_eq!(body, "[1,2]");
    }

    #[test]
    fn test_registry_unknown_key() {
        let (req, mut resp) = fixtures();
        let registry = RenderRegistry::new(&Settings::default());
        let err = registry
            .render("xml", &json!({}), &req, &mut resp)
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InternalServerError);
    }

    #[test]
    fn test_template_key_pattern() {
        assert!(TEMPLATE_KEY.is_match("login.html"));
        assert!(TEMPLATE_KEY.is_match("pages/index.j2"));
        assert!(TEMPLATE_KEY.is_match("mail.jinja"));
        assert!(!TEMPLATE_KEY.is_match("json"));
        assert!(!TEMPLATE_KEY.is_match("html"));
    }

    #[test]
    fn test_missing_template_is_internal_error() {
        let (req, mut resp) = fixtures();
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            document_root: Some(dir.path().to_path_buf()),
            ..Settings::default()
        };
        let registry = RenderRegistry::new(&settings);
        let err = registry
            .render("absent.html", &json!({}), &req, &mut resp)
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InternalServerError);
    }

    #[test]
    fn test_template_renders_with_data() {
        let (req, mut resp) = fixtures();
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("hello.html"), "<h1>Hello {{ name }}!</h1>").unwrap();
        let settings = Settings {
            document_root: Some(dir.path().to_path_buf()),
            ..Settings::default()
        };
        let registry = RenderRegistry::new(&settings);
        let body = registry
            .render("hello.html", &json!({"name": "World"}), &req, &mut resp)
            .unwrap();
        assert_eq!(body, "<h1>Hello World!</h1>");
        assert_eq!(resp.get_header("Content-Type"), Some("text/html"));
    }
}
