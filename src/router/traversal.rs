//! Traversal resolution.
//!
//! The path is split into non-empty segments and resolved by repeated
//! [`TraversalNode::lookup`] calls starting at a root node. Exhausting
//! the segments yields the final node as the handler context; any
//! failed lookup yields `None`.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::dispatcher::{Handler, HandlerResult};
use crate::error::ErrorResponse;
use crate::request::Request;
use crate::response::Response;

/// A node in a traversal tree.
///
/// `lookup` is the descent contract: a missing child is `Some`-less,
/// never an error. The method entry points default to NotFound so leaf
/// types only implement the verbs they serve; `on_get` answers GET and
/// `on_post` answers every other method.
pub trait TraversalNode: Send + Sync {
    /// Resolve one path segment to a child node.
    fn lookup(&self, segment: &str) -> Option<Arc<dyn TraversalNode>>;

    /// Handle a GET request resolved to this node.
    fn on_get(&self, _req: &mut Request, _resp: &mut Response) -> HandlerResult {
        Err(ErrorResponse::not_found())
    }

    /// Handle a non-GET request resolved to this node.
    fn on_post(&self, _req: &mut Request, _resp: &mut Response) -> HandlerResult {
        Err(ErrorResponse::not_found())
    }
}

/// Walk the tree from `root` along the path's non-empty segments.
#[must_use]
pub fn traverse(root: &Arc<dyn TraversalNode>, path: &str) -> Option<Arc<dyn TraversalNode>> {
    let mut current = Arc::clone(root);
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        match current.lookup(segment) {
            Some(next) => current = next,
            None => {
                debug!(path = %path, segment = %segment, "Traversal lookup failed");
                return None;
            }
        }
    }
    Some(current)
}

/// Map-backed traversal node with optional GET/POST handlers.
///
/// Built with the chained constructors:
///
/// ```rust,ignore
/// let root = Arc::new(
///     TreeNode::new()
///         .get(|_req, _resp| Ok(Action::Body("home".into())))
///         .child("about", TreeNode::new().get(about_handler)),
/// );
/// ```
#[derive(Default)]
pub struct TreeNode {
    children: HashMap<String, Arc<dyn TraversalNode>>,
    get_handler: Option<Handler>,
    post_handler: Option<Handler>,
}

impl TreeNode {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a child node under a segment name.
    #[must_use]
    pub fn child(mut self, segment: &str, node: impl TraversalNode + 'static) -> Self {
        self.children.insert(segment.to_string(), Arc::new(node));
        self
    }

    /// Set the GET handler for this node.
    #[must_use]
    pub fn get<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.get_handler = Some(Arc::new(f));
        self
    }

    /// Set the handler for non-GET methods on this node.
    #[must_use]
    pub fn post<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.post_handler = Some(Arc::new(f));
        self
    }
}

impl TraversalNode for TreeNode {
    fn lookup(&self, segment: &str) -> Option<Arc<dyn TraversalNode>> {
        self.children.get(segment).map(Arc::clone)
    }

    fn on_get(&self, req: &mut Request, resp: &mut Response) -> HandlerResult {
        match &self.get_handler {
            Some(handler) => handler(req, resp),
            None => Err(ErrorResponse::not_found()),
        }
    }

    fn on_post(&self, req: &mut Request, resp: &mut Response) -> HandlerResult {
        match &self.post_handler {
            Some(handler) => handler(req, resp),
            None => Err(ErrorResponse::not_found()),
        }
    }
}
