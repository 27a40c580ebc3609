use crate::request::Request;
use crate::response::Response;

/// Hook pair run around every dispatched request.
///
/// Both hooks default to no-ops so implementors only override the side
/// they care about. Hooks mutate the request and response in place;
/// they cannot short-circuit dispatch.
pub trait Middleware: Send + Sync {
    /// Runs before the handler, in registration order.
    fn before(&self, _req: &mut Request, _resp: &mut Response) {}

    /// Runs after the handler, in registration order. Skipped when the
    /// request took the error branch.
    fn after(&self, _req: &mut Request, _resp: &mut Response) {}
}

/// Adapter for registering a bare closure as a hook.
///
/// Fires on both sides; which chain it is registered into decides
/// whether that is before or after the handler.
pub struct FnMiddleware<F>(F);

impl<F> FnMiddleware<F>
where
    F: Fn(&mut Request, &mut Response) + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> Middleware for FnMiddleware<F>
where
    F: Fn(&mut Request, &mut Response) + Send + Sync,
{
    fn before(&self, req: &mut Request, resp: &mut Response) {
        (self.0)(req, resp);
    }

    fn after(&self, req: &mut Request, resp: &mut Response) {
        (self.0)(req, resp);
    }
}
