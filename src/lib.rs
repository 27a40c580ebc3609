//! # Retort
//!
//! **Retort** is a small synchronous web framework core: a dispatch
//! pipeline between a transport's gateway environment and your
//! handlers, with no HTTP server of its own.
//!
//! ## Overview
//!
//! A transport builds an [`environ::Environ`] for each inbound request
//! and calls [`dispatcher::Retort::handle`]; the application resolves a
//! handler, runs the middleware chains around it and hands back an
//! [`environ::Transmission`] of status line, headers and a body
//! iterable. Handler failures are typed [`error::ErrorResponse`] values
//! carried in `Result`, converted to responses at the dispatcher
//! boundary or intercepted by registered listeners.
//!
//! ## Architecture
//!
//! - **[`environ`]** - the transport boundary types
//! - **[`router`]** - table routing with named captures, and traversal
//!   trees for hierarchical apps
//! - **[`dispatcher`]** - the per-request state machine and the
//!   application type
//! - **[`middleware`]** - before/after hook chains
//! - **[`request`]** / **[`response`]** - the pair every handler works on
//! - **[`render`]** - pluggable render strategies (JSON, minijinja
//!   templates)
//! - **[`session`]** - dirty-tracked sessions with a file-backed store
//! - **[`error`]** - the error taxonomy and its response conversion
//!
//! ## Example
//!
//! ```rust,no_run
//! use retort::config::Settings;
//! use retort::dispatcher::{Action, Retort};
//! use retort::router::RouteTarget;
//!
//! let mut app = Retort::new(Settings::default());
//! app.connect(
//!     "hello",
//!     "/hello/{name}",
//!     RouteTarget::handler(|req, _resp| {
//!         let name = req.param("name").unwrap_or("world").to_string();
//!         Ok(Action::Body(format!("Hello {name}")))
//!     }),
//!     None,
//! );
//! // Per request, the transport calls:
//! // let transmission = app.handle(environ);
//! ```

pub mod config;
pub mod dispatcher;
pub mod encoding;
pub mod environ;
pub mod error;
pub mod headers;
pub mod middleware;
pub mod multipart;
pub mod render;
pub mod request;
pub mod response;
pub mod router;
pub mod session;
pub mod telemetry;

pub use dispatcher::{Action, Controller, Handler, HandlerResult, Retort};
pub use environ::{Environ, Transmission};
pub use error::{ErrorKind, ErrorResponse};
pub use request::Request;
pub use response::Response;
pub use router::{RouteTarget, TraversalNode, TreeNode};
