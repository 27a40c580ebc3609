//! Request resolution.
//!
//! Two interchangeable strategies map a path to a handler context:
//! [`RouteTable`] matches registered patterns with named captures, and
//! [`traversal`] descends a tree of nodes segment by segment. Neither
//! strategy errors on a miss — absence is signalled with `None` and the
//! dispatcher converts it into the NotFound path.

mod core;
pub mod traversal;

pub use core::{ParamVec, Route, RouteMatch, RouteTable, RouteTarget, MAX_INLINE_PARAMS};
pub use traversal::{traverse, TraversalNode, TreeNode};
