//! Table routing - hot path for request resolution.

use std::collections::HashMap;

use http::Method;
use regex::Regex;
use smallvec::SmallVec;
use tracing::{debug, error, info, warn};

use crate::dispatcher::Handler;

/// Maximum number of captured parameters before heap allocation.
/// Most routes have well under 8 named captures.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Stack-allocated parameter storage for captured route parameters.
pub type ParamVec = SmallVec<[(String, String); MAX_INLINE_PARAMS]>;

/// What a matched route dispatches to.
#[derive(Clone)]
pub enum RouteTarget {
    /// A directly registered handler callable.
    Handler(Handler),
    /// A named controller and the action to invoke on it.
    Controller { controller: String, action: String },
}

impl RouteTarget {
    /// Wrap a handler function as a route target.
    pub fn handler<F>(f: F) -> Self
    where
        F: Fn(&mut crate::request::Request, &mut crate::response::Response) -> crate::dispatcher::HandlerResult
            + Send
            + Sync
            + 'static,
    {
        RouteTarget::Handler(std::sync::Arc::new(f))
    }

    /// Point a route at a controller action by name.
    #[must_use]
    pub fn controller(controller: &str, action: &str) -> Self {
        RouteTarget::Controller {
            controller: controller.to_string(),
            action: action.to_string(),
        }
    }
}

impl std::fmt::Debug for RouteTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RouteTarget::Handler(_) => write!(f, "RouteTarget::Handler"),
            RouteTarget::Controller { controller, action } => {
                write!(f, "RouteTarget::Controller({controller}.{action})")
            }
        }
    }
}

/// One registered route: a compiled pattern, optional method
/// conditions, and the target it dispatches to.
pub struct Route {
    name: String,
    pattern: String,
    regex: Regex,
    param_names: Vec<String>,
    conditions: Option<Vec<Method>>,
    target: RouteTarget,
}

impl Route {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

/// Result of successfully matching a path against the route table.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    /// Name the route was registered under.
    pub route_name: String,
    /// Captured parameters in pattern order (the matchdict).
    pub params: ParamVec,
    /// Target to dispatch to.
    pub target: RouteTarget,
}

impl RouteMatch {
    /// Get a captured parameter by name, last occurrence winning when a
    /// name repeats at different path depths.
    #[inline]
    #[must_use]
    pub fn get_param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .rfind(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Copy captured parameters into a map. Allocates; prefer
    /// [`RouteMatch::get_param`] on the hot path.
    #[must_use]
    pub fn params_map(&self) -> HashMap<String, String> {
        self.params
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

/// Ordered route table with first-match-wins semantics.
///
/// Patterns use `{name}` segments for named captures:
/// `/users/{id}/posts/{post_id}`. Registration happens during the
/// single-threaded setup phase; matching is read-only afterwards.
#[derive(Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a route.
    ///
    /// `conditions` restricts the route to the listed methods; `None`
    /// matches any method. Routes are tried in registration order and
    /// the first match wins, so register more specific patterns first.
    /// A pattern that fails to compile is logged and not registered.
    pub fn connect(
        &mut self,
        name: &str,
        pattern: &str,
        target: RouteTarget,
        conditions: Option<&[Method]>,
    ) {
        let (regex, param_names) = match Self::path_to_regex(pattern) {
            Ok(compiled) => compiled,
            Err(e) => {
                error!(
                    route_name = %name,
                    pattern = %pattern,
                    error = %e,
                    "Route pattern failed to compile, route not registered"
                );
                return;
            }
        };
        info!(
            route_name = %name,
            pattern = %pattern,
            conditions = ?conditions,
            target = ?target,
            total_routes = self.routes.len() + 1,
            "Route registered"
        );
        self.routes.push(Route {
            name: name.to_string(),
            pattern: pattern.to_string(),
            regex,
            param_names,
            conditions: conditions.map(<[Method]>::to_vec),
            target,
        });
    }

    /// Match a normalized path and method against the table.
    ///
    /// Returns `None` when nothing matches; the caller decides what
    /// absence means (the dispatcher raises NotFound).
    #[must_use]
    pub fn matches(&self, path: &str, method: &Method) -> Option<RouteMatch> {
        debug!(method = %method, path = %path, routes = self.routes.len(), "Route match attempt");

        for route in &self.routes {
            if let Some(allowed) = &route.conditions {
                if !allowed.contains(method) {
                    continue;
                }
            }
            if let Some(caps) = route.regex.captures(path) {
                let mut params = ParamVec::new();
                for (name, cap) in route.param_names.iter().zip(caps.iter().skip(1)) {
                    if let Some(m) = cap {
                        params.push((name.clone(), m.as_str().to_string()));
                    }
                }
                info!(
                    method = %method,
                    path = %path,
                    route_name = %route.name,
                    pattern = %route.pattern,
                    params = ?params,
                    "Route matched"
                );
                return Some(RouteMatch {
                    route_name: route.name.clone(),
                    params,
                    target: route.target.clone(),
                });
            }
        }

        warn!(method = %method, path = %path, "No route matched");
        None
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Convert a route pattern to a regex and its capture names.
    ///
    /// `/users/{id}` becomes `^/users/([^/]+)$` with names `["id"]`.
    /// Literal segments are escaped, so compilation only fails for
    /// patterns the regex engine itself rejects (e.g. size limits).
    pub(crate) fn path_to_regex(pattern: &str) -> Result<(Regex, Vec<String>), regex::Error> {
        if pattern == "/" {
            return Ok((Regex::new(r"^/$")?, Vec::new()));
        }

        let mut regex = String::with_capacity(pattern.len() + 5);
        regex.push('^');
        let mut param_names = Vec::with_capacity(pattern.matches('{').count());

        for segment in pattern.split('/') {
            if segment.starts_with('{') && segment.ends_with('}') {
                let name = segment
                    .trim_start_matches('{')
                    .trim_end_matches('}')
                    .to_string();
                regex.push_str("/([^/]+)");
                param_names.push(name);
            } else if !segment.is_empty() {
                regex.push('/');
                regex.push_str(&regex::escape(segment));
            }
        }

        regex.push('$');
        let regex = Regex::new(&regex)?;

        Ok((regex, param_names))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::Action;

    fn noop_target() -> RouteTarget {
        RouteTarget::handler(|_req, _resp| Ok(Action::Body(String::new())))
    }

    #[test]
    fn test_path_to_regex_extracts_params() {
        let (regex, names) = RouteTable::path_to_regex("/users/{id}/posts/{post_id}").unwrap();
        assert_eq!(names, vec!["id", "post_id"]);
        assert!(regex.is_match("/users/7/posts/42"));
        assert!(!regex.is_match("/users/7/posts"));
        assert!(!regex.is_match("/users/7/posts/42/extra"));
    }

    #[test]
    fn test_root_pattern() {
        let (regex, names) = RouteTable::path_to_regex("/").unwrap();
        assert!(names.is_empty());
        assert!(regex.is_match("/"));
        assert!(!regex.is_match("/a"));
    }

    #[test]
    fn test_literal_segments_are_escaped() {
        let (regex, _) = RouteTable::path_to_regex("/v1.0/items").unwrap();
        assert!(regex.is_match("/v1.0/items"));
        assert!(!regex.is_match("/v1X0/items"));
    }

    #[test]
    fn test_metacharacter_segments_compile_and_match_literally() {
        let mut table = RouteTable::new();
        table.connect("odd", "/a(b/{id}", noop_target(), None);
        assert_eq!(table.len(), 1);
        let m = table.matches("/a(b/7", &Method::GET).unwrap();
        assert_eq!(m.get_param("id"), Some("7"));
    }

    #[test]
    fn test_match_captures_params() {
        let mut table = RouteTable::new();
        table.connect("user", "/{user}/info", noop_target(), None);
        let m = table.matches("/Foo/info", &Method::GET).unwrap();
        assert_eq!(m.route_name, "user");
        assert_eq!(m.get_param("user"), Some("Foo"));
        assert!(table.matches("/Foo/info/extra", &Method::GET).is_none());
    }

    #[test]
    fn test_method_conditions() {
        let mut table = RouteTable::new();
        table.connect("get_home", "/", noop_target(), Some(&[Method::GET]));
        table.connect("post_home", "/", noop_target(), Some(&[Method::POST]));
        assert_eq!(
            table.matches("/", &Method::GET).unwrap().route_name,
            "get_home"
        );
        assert_eq!(
            table.matches("/", &Method::POST).unwrap().route_name,
            "post_home"
        );
        assert!(table.matches("/", &Method::DELETE).is_none());
    }

    #[test]
    fn test_first_match_wins_and_is_deterministic() {
        let mut table = RouteTable::new();
        table.connect("specific", "/items/special", noop_target(), None);
        table.connect("generic", "/items/{id}", noop_target(), None);
        for _ in 0..3 {
            let m = table.matches("/items/special", &Method::GET).unwrap();
            assert_eq!(m.route_name, "specific");
        }
        let m = table.matches("/items/7", &Method::GET).unwrap();
        assert_eq!(m.route_name, "generic");
        assert_eq!(m.get_param("id"), Some("7"));
    }

    #[test]
    fn test_last_wins_on_repeated_param_names() {
        let mut table = RouteTable::new();
        table.connect("nested", "/org/{id}/user/{id}", noop_target(), None);
        let m = table.matches("/org/1/user/2", &Method::GET).unwrap();
        assert_eq!(m.get_param("id"), Some("2"));
    }
}
