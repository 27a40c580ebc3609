//! Typed error responses.
//!
//! An [`ErrorResponse`] is both an abnormal-termination signal and a
//! complete HTTP response: it always carries a status plus a structured
//! `{title, description}` body, so the dispatcher can transmit it as-is
//! when no listener overrides it. Handlers return it through
//! `Result<Action, ErrorResponse>` rather than panicking; the dispatcher
//! is the single place these are converted.

use http::StatusCode;

use crate::response::Response;

/// Identity of an error response, used as the exact-match key for
/// exception listeners. There is no hierarchy-based fallback: a listener
/// registered for [`ErrorKind::BadRequest`] sees only bad requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MovedPermanently,
    Moved,
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    NotAcceptable,
    InternalServerError,
}

/// A status-bearing error that is also a valid response.
#[derive(Debug, Clone)]
pub struct ErrorResponse {
    kind: ErrorKind,
    status: StatusCode,
    title: String,
    description: String,
    headers: Vec<(String, String)>,
}

impl ErrorResponse {
    fn new(kind: ErrorKind, status: StatusCode, title: &str, description: &str) -> Self {
        Self {
            kind,
            status,
            title: title.to_string(),
            description: description.to_string(),
            headers: Vec::new(),
        }
    }

    /// 301 redirect carrying a `Location` header.
    #[must_use]
    pub fn moved_permanently(location: &str) -> Self {
        let mut err = Self::new(
            ErrorKind::MovedPermanently,
            StatusCode::MOVED_PERMANENTLY,
            "301 Moved Permanently",
            "Resource has moved",
        );
        err.headers.push(("Location".to_string(), location.to_string()));
        err
    }

    /// 302 redirect carrying a `Location` header.
    #[must_use]
    pub fn moved(location: &str) -> Self {
        let mut err = Self::new(
            ErrorKind::Moved,
            StatusCode::FOUND,
            "302 Found",
            "Resource has moved",
        );
        err.headers.push(("Location".to_string(), location.to_string()));
        err
    }

    #[must_use]
    pub fn bad_request() -> Self {
        Self::new(
            ErrorKind::BadRequest,
            StatusCode::BAD_REQUEST,
            "400 Bad Request",
            "",
        )
    }

    #[must_use]
    pub fn unauthorized() -> Self {
        Self::new(
            ErrorKind::Unauthorized,
            StatusCode::UNAUTHORIZED,
            "401 Unauthorized",
            "",
        )
    }

    #[must_use]
    pub fn forbidden() -> Self {
        Self::new(
            ErrorKind::Forbidden,
            StatusCode::FORBIDDEN,
            "403 Forbidden",
            "",
        )
    }

    #[must_use]
    pub fn not_found() -> Self {
        Self::new(
            ErrorKind::NotFound,
            StatusCode::NOT_FOUND,
            "404 Not Found",
            "Page not found",
        )
    }

    #[must_use]
    pub fn not_acceptable() -> Self {
        Self::new(
            ErrorKind::NotAcceptable,
            StatusCode::NOT_ACCEPTABLE,
            "406 Not Acceptable",
            "Content not acceptable",
        )
    }

    #[must_use]
    pub fn internal_server_error() -> Self {
        Self::new(
            ErrorKind::InternalServerError,
            StatusCode::INTERNAL_SERVER_ERROR,
            "500 Internal Server Error",
            "An error has occurred processing your request",
        )
    }

    /// Replace the default title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Replace the default description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    fn is_redirect(&self) -> bool {
        matches!(self.kind, ErrorKind::MovedPermanently | ErrorKind::Moved)
    }

    /// Derive the response this error stands for.
    ///
    /// Redirect kinds get an HTML anchor body pointing at their
    /// `Location`; all other kinds get the JSON `{title, description}`
    /// body produced by the default render strategy.
    #[must_use]
    pub fn to_response(&self) -> Response {
        let mut resp = Response::with_status(self.status);
        for (name, value) in &self.headers {
            resp.add_header(name, value);
        }
        if self.is_redirect() {
            let location = self
                .headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case("Location"))
                .map(|(_, v)| v.as_str())
                .unwrap_or("/");
            resp.set_header("Content-Type", "text/html");
            resp.set_body(format!("<a href='{location}'>{location}</a>"));
        } else {
            resp.set_header("Content-Type", "application/json");
            resp.set_body(
                serde_json::json!({
                    "title": self.title,
                    "description": self.description,
                })
                .to_string(),
            );
        }
        resp
    }
}

impl std::fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.description.is_empty() {
            write!(f, "{}", self.title)
        } else {
            write!(f, "{}: {}", self.title, self.description)
        }
    }
}

impl std::error::Error for ErrorResponse {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_defaults() {
        let err = ErrorResponse::not_found();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.title(), "404 Not Found");
        assert_eq!(err.description(), "Page not found");
    }

    #[test]
    fn test_error_body_is_structured_json() {
        let resp = ErrorResponse::internal_server_error().to_response();
        let body = resp.body().unwrap();
        let value: serde_json::Value = serde_json::from_slice(body).unwrap();
        assert_eq!(value["title"], "500 Internal Server Error");
        assert_eq!(
            value["description"],
            "An error has occurred processing your request"
        );
        assert_eq!(resp.get_header("content-type"), Some("application/json"));
    }

    #[test]
    fn test_redirect_carries_location_and_anchor() {
        let resp = ErrorResponse::moved("/elsewhere").to_response();
        assert_eq!(resp.get_header("Location"), Some("/elsewhere"));
        assert_eq!(resp.get_header("Content-Type"), Some("text/html"));
        let body = String::from_utf8(resp.body().unwrap().to_vec()).unwrap();
        assert_eq!(body, "<a href='/elsewhere'>/elsewhere</a>");
    }

    #[test]
    fn test_with_description_overrides_default() {
        let err = ErrorResponse::bad_request().with_description("missing field");
        assert_eq!(err.description(), "missing field");
        assert_eq!(err.title(), "400 Bad Request");
    }
}
