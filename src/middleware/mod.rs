//! Request/response middleware.
//!
//! Middleware registered on the application runs `before` hooks in
//! registration order ahead of the handler and `after` hooks in the
//! same order once the handler (or error listener) has produced a
//! response.

mod core;

pub use core::{FnMiddleware, Middleware};
