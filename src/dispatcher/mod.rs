//! Request dispatch.
//!
//! [`Retort`] is the application type: routes, controllers, error
//! listeners, middleware, renderers and the session factory are
//! registered during setup, then [`Retort::handle`] drives each
//! request through resolve, before-hooks, invoke, after-hooks and
//! finalization, branching to the error path whenever a step yields an
//! [`ErrorResponse`](crate::error::ErrorResponse).

mod core;

pub use core::{Action, Controller, Handler, HandlerResult, Resolver, Retort};
