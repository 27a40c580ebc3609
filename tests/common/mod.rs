#![allow(dead_code)]

use std::io::Cursor;

use http::Method;
use retort::environ::{Environ, Transmission};

/// Install the tracing subscriber once for the test binary.
pub fn init_logging() {
    retort::telemetry::init();
}

/// Environ mirroring a typical gateway: https behind `foobar.baz:8080`
/// with a script root and a couple of `HTTP_*` vars.
pub fn mock_env(method: Method, path: &str) -> Environ {
    let mut env = Environ::new(method, path);
    env.scheme = "https".to_string();
    env.server_name = "foobar.baz".to_string();
    env.server_port = 8080;
    env.script_name = "/some/script/dir".to_string();
    env.gateway_vars
        .push(("HTTP_HOST".to_string(), "foobar.baz:8080".to_string()));
    env.gateway_vars
        .push(("HTTP_X_H_Test".to_string(), "Foobar".to_string()));
    env
}

/// GET environ with a query string.
pub fn get_env(path: &str, query: &str) -> Environ {
    let mut env = mock_env(Method::GET, path);
    env.query_string = query.to_string();
    env
}

/// POST environ carrying an urlencoded form body.
pub fn form_env(path: &str, body: &str) -> Environ {
    let mut env = mock_env(Method::POST, path);
    env.content_type = Some("application/x-www-form-urlencoded".to_string());
    env.content_length = Some(body.len());
    env.input = Box::new(Cursor::new(body.as_bytes().to_vec()));
    env
}

/// Drain a transmission's body iterable into a string.
pub fn body_string(tx: Transmission) -> String {
    let mut bytes = Vec::new();
    for chunk in tx.body {
        bytes.extend_from_slice(&chunk.expect("body chunk read failed"));
    }
    String::from_utf8(bytes).expect("body was not UTF-8")
}
