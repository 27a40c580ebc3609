//! Dispatcher core - the per-request state machine.

use std::collections::HashMap;
use std::sync::Arc;

use http::Method;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::config::Settings;
use crate::environ::{Environ, Transmission};
use crate::error::{ErrorKind, ErrorResponse};
use crate::middleware::{FnMiddleware, Middleware};
use crate::render::{RenderRegistry, Renderer};
use crate::request::Request;
use crate::response::Response;
use crate::router::{traverse, RouteTable, RouteTarget, TraversalNode};
use crate::session::SessionFactory;

/// What a handler asks the dispatcher to do with its output.
#[derive(Debug)]
pub enum Action {
    /// Replace the working response wholesale.
    Respond(Response),
    /// Use the string as the response body.
    Body(String),
    /// Run `data` through the render registry under `template`.
    Render { template: String, data: Value },
}

/// Handler outcome: an [`Action`] on success, an [`ErrorResponse`]
/// routed to the error branch otherwise.
pub type HandlerResult = Result<Action, ErrorResponse>;

/// A registered handler callable.
pub type Handler = Arc<dyn Fn(&mut Request, &mut Response) -> HandlerResult + Send + Sync>;

/// A named group of actions reachable from table routes.
///
/// Routes registered with [`RouteTarget::controller`] name a controller
/// and an action; the dispatcher resolves the controller by name and
/// asks it to invoke the action. Returning `None` means the action does
/// not exist and the request takes the NotFound path.
pub trait Controller: Send + Sync {
    fn invoke(&self, action: &str, req: &mut Request, resp: &mut Response)
        -> Option<HandlerResult>;
}

/// Resolution strategy selected at construction.
pub enum Resolver {
    /// Ordered pattern table with named captures.
    Table(RouteTable),
    /// Segment-wise descent through a node tree.
    Traversal(Arc<dyn TraversalNode>),
}

/// The application: registration surface plus the dispatch pipeline.
///
/// Registration takes `&mut self` and belongs to the single-threaded
/// setup phase. Request processing takes `&self`; once the application
/// is shared with the transport the tables are read-only, and mutating
/// them during live traffic is unsupported.
pub struct Retort {
    settings: Arc<Settings>,
    resolver: Resolver,
    controllers: HashMap<String, Box<dyn Controller>>,
    listeners: HashMap<ErrorKind, Handler>,
    before: Vec<Arc<dyn Middleware>>,
    after: Vec<Arc<dyn Middleware>>,
    renderers: RenderRegistry,
    session_factory: Option<Box<dyn SessionFactory>>,
}

impl Retort {
    /// Build an application resolving through a route table.
    #[must_use]
    pub fn new(settings: Settings) -> Self {
        Self::with_resolver(settings, Resolver::Table(RouteTable::new()))
    }

    /// Build an application resolving by traversal from `root`.
    #[must_use]
    pub fn with_base_node(settings: Settings, root: Arc<dyn TraversalNode>) -> Self {
        Self::with_resolver(settings, Resolver::Traversal(root))
    }

    fn with_resolver(settings: Settings, resolver: Resolver) -> Self {
        let renderers = RenderRegistry::new(&settings);
        Self {
            settings: Arc::new(settings),
            resolver,
            controllers: HashMap::new(),
            listeners: HashMap::new(),
            before: Vec::new(),
            after: Vec::new(),
            renderers,
            session_factory: None,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Register a table route. No-op with a warning on traversal
    /// applications.
    pub fn connect(
        &mut self,
        name: &str,
        pattern: &str,
        target: RouteTarget,
        conditions: Option<&[Method]>,
    ) {
        match &mut self.resolver {
            Resolver::Table(table) => table.connect(name, pattern, target, conditions),
            Resolver::Traversal(_) => {
                warn!(route_name = %name, "connect() ignored, application resolves by traversal");
            }
        }
    }

    /// Register a controller under a name routes can target.
    pub fn add_controller(&mut self, name: &str, controller: impl Controller + 'static) {
        info!(controller = %name, "Controller registered");
        self.controllers.insert(name.to_string(), Box::new(controller));
    }

    /// Register an error listener for one exact error kind.
    pub fn on_except<F>(&mut self, kind: ErrorKind, listener: F)
    where
        F: Fn(&mut Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        info!(kind = ?kind, "Error listener registered");
        self.listeners.insert(kind, Arc::new(listener));
    }

    /// Register middleware into the before or after chain.
    pub fn use_middleware(&mut self, middleware: Arc<dyn Middleware>, before: bool) {
        if before {
            self.before.push(middleware);
        } else {
            self.after.push(middleware);
        }
        debug!(
            before_hooks = self.before.len(),
            after_hooks = self.after.len(),
            "Middleware registered"
        );
    }

    /// Register a bare closure as a before or after hook.
    pub fn use_fn<F>(&mut self, hook: F, before: bool)
    where
        F: Fn(&mut Request, &mut Response) + Send + Sync + 'static,
    {
        self.use_middleware(Arc::new(FnMiddleware::new(hook)), before);
    }

    /// Install a named render strategy.
    pub fn add_renderer(&mut self, name: &str, renderer: impl Renderer + 'static) {
        self.renderers.add(name, renderer);
    }

    /// Install the session factory. Sessions are off until one is set.
    pub fn set_session_factory(&mut self, factory: impl SessionFactory + 'static) {
        self.session_factory = Some(Box::new(factory));
    }

    /// Drive one request through the pipeline.
    ///
    /// Only `ErrorResponse` failures are handled here; anything that
    /// panics propagates to the transport.
    pub fn handle(&self, env: Environ) -> Transmission {
        let mut req = Request::new(env, Arc::clone(&self.settings));
        debug!(method = %req.method(), path = %req.path(), "Dispatching request");

        if let Some(factory) = &self.session_factory {
            if let Err(e) = factory.load(&mut req) {
                error!(error = %e, "Session load failed");
            }
        }

        match self.process(&mut req) {
            Ok(resp) => self.transmit(&mut req, resp, None),
            Err(err) => self.handle_error(&mut req, err),
        }
    }

    /// RESOLVE through AFTER on the success path.
    fn process(&self, req: &mut Request) -> Result<Response, ErrorResponse> {
        let mut resp = Response::new();

        let result = match &self.resolver {
            Resolver::Table(table) => {
                let matched = table
                    .matches(req.path(), req.method())
                    .ok_or_else(ErrorResponse::not_found)?;
                req.matchdict = matched.params;

                self.run_before(req, &mut resp);

                match &matched.target {
                    RouteTarget::Handler(handler) => handler(req, &mut resp),
                    RouteTarget::Controller { controller, action } => {
                        let ctrl = self.controllers.get(controller).ok_or_else(|| {
                            warn!(controller = %controller, "Route names an unregistered controller");
                            ErrorResponse::not_found()
                        })?;
                        ctrl.invoke(action, req, &mut resp).ok_or_else(|| {
                            warn!(controller = %controller, action = %action, "Unknown controller action");
                            ErrorResponse::not_found()
                        })?
                    }
                }
            }
            Resolver::Traversal(root) => {
                let node =
                    traverse(root, req.path()).ok_or_else(ErrorResponse::not_found)?;

                self.run_before(req, &mut resp);

                if req.method() == Method::GET {
                    node.on_get(req, &mut resp)
                } else {
                    node.on_post(req, &mut resp)
                }
            }
        };

        let mut resp = self.apply_action(req, resp, result?)?;

        for mw in &self.after {
            mw.after(req, &mut resp);
        }
        for cb in req.take_callbacks() {
            cb(req, &mut resp);
        }

        Ok(resp)
    }

    fn run_before(&self, req: &mut Request, resp: &mut Response) {
        for mw in &self.before {
            mw.before(req, resp);
        }
    }

    /// Interpret a handler's action against the working response.
    fn apply_action(
        &self,
        req: &mut Request,
        mut resp: Response,
        action: Action,
    ) -> Result<Response, ErrorResponse> {
        match action {
            Action::Respond(replacement) => Ok(replacement),
            Action::Body(body) => {
                resp.set_body(body);
                Ok(resp)
            }
            Action::Render { template, data } => {
                let body = self.renderers.render(&template, &data, req, &mut resp)?;
                resp.set_body(body);
                Ok(resp)
            }
        }
    }

    /// The error branch: exact-kind listener lookup, otherwise the
    /// error's derived response travels unchanged with the error
    /// attached to the transmission.
    fn handle_error(&self, req: &mut Request, err: ErrorResponse) -> Transmission {
        let Some(listener) = self.listeners.get(&err.kind()) else {
            info!(kind = ?err.kind(), status = %err.status(), "Unhandled error response");
            let resp = err.to_response();
            return self.transmit(req, resp, Some(err));
        };

        debug!(kind = ?err.kind(), "Error listener invoked");
        let mut resp = err.to_response();
        match listener(req, &mut resp) {
            Ok(action) => match self.apply_action(req, resp, action) {
                Ok(resp) => self.transmit(req, resp, None),
                // A listener whose render fails is itself unhandled;
                // no recursive listener dispatch.
                Err(err2) => {
                    let resp = err2.to_response();
                    self.transmit(req, resp, Some(err2))
                }
            },
            Err(err2) => {
                let resp = err2.to_response();
                self.transmit(req, resp, Some(err2))
            }
        }
    }

    /// Session save then finalize; every path funnels through here
    /// exactly once.
    fn transmit(
        &self,
        req: &mut Request,
        mut resp: Response,
        err: Option<ErrorResponse>,
    ) -> Transmission {
        if let Some(factory) = &self.session_factory {
            if let Err(e) = factory.save(req, &mut resp) {
                error!(error = %e, "Session save failed");
            }
        }

        let wrapper = req.take_file_wrapper();
        let (status, headers, body) = resp.finalize(wrapper.as_ref());
        info!(status = %status, error = err.is_some(), "Request finished");
        Transmission {
            status,
            headers,
            body,
            error: err,
        }
    }
}
