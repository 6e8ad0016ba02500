//! Feature matchers.
//!
//! A matcher answers, for an in-flight traversal, whether the next edge or the
//! node just reached keeps the traversal consistent with a feature. Matchers
//! hold no traversal state: the caller passes `steps_taken` (edges traversed
//! so far) with every query, so one matcher serves any number of concurrent
//! walks.

use std::collections::BTreeSet;

use tracing::debug;

use crate::graph::PathTypeAlgebra;
use crate::path::{PathDescriptor, PATH_DELIMITER};
use crate::{EdgeTypeId, FeatureError, NodeId};

/// Either the complete admissible set, or "not enumerable here".
///
/// `Only` with an empty set permits nothing; `Unknown` means the caller has to
/// test candidates one by one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Allowed<T: Ord> {
    Only(BTreeSet<T>),
    Unknown,
}

impl<T: Ord> Allowed<T> {
    pub fn only(item: T) -> Self {
        Allowed::Only(BTreeSet::from([item]))
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Allowed::Unknown)
    }

    pub fn as_set(&self) -> Option<&BTreeSet<T>> {
        match self {
            Allowed::Only(set) => Some(set),
            Allowed::Unknown => None,
        }
    }
}

/// Step-by-step feature check consumed by graph walkers.
pub trait FeatureMatcher {
    /// No further steps are required.
    fn is_finished(&self, steps_taken: usize) -> bool;

    /// Taking this edge as step number `steps_taken` keeps the walk alive.
    fn edge_ok(&self, edge_type: EdgeTypeId, reverse: bool, steps_taken: usize) -> bool;

    /// Landing on `node` after `steps_taken` steps is acceptable.
    fn node_ok(&self, node: NodeId, steps_taken: usize) -> bool;

    fn allowed_edges(&self, steps_taken: usize) -> Allowed<(EdgeTypeId, bool)>;

    fn allowed_nodes(&self, steps_taken: usize) -> Allowed<NodeId>;
}

/// Matches nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmptyMatcher;

impl FeatureMatcher for EmptyMatcher {
    fn is_finished(&self, _steps_taken: usize) -> bool {
        false
    }

    fn edge_ok(&self, _edge_type: EdgeTypeId, _reverse: bool, _steps_taken: usize) -> bool {
        false
    }

    fn node_ok(&self, _node: NodeId, _steps_taken: usize) -> bool {
        false
    }

    fn allowed_edges(&self, _steps_taken: usize) -> Allowed<(EdgeTypeId, bool)> {
        Allowed::Unknown
    }

    fn allowed_nodes(&self, _steps_taken: usize) -> Allowed<NodeId> {
        Allowed::Unknown
    }
}

/// Matches exactly one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMatcher {
    path: PathDescriptor,
}

impl PathMatcher {
    pub fn new(path: PathDescriptor) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &PathDescriptor {
        &self.path
    }

    pub fn num_hops(&self) -> usize {
        self.path.num_hops()
    }
}

impl FeatureMatcher for PathMatcher {
    fn is_finished(&self, steps_taken: usize) -> bool {
        steps_taken >= self.path.num_hops()
    }

    fn edge_ok(&self, edge_type: EdgeTypeId, reverse: bool, steps_taken: usize) -> bool {
        self.path
            .step(steps_taken)
            .is_some_and(|step| step.edge_type == edge_type && step.reverse == reverse)
    }

    fn node_ok(&self, _node: NodeId, _steps_taken: usize) -> bool {
        true
    }

    fn allowed_edges(&self, steps_taken: usize) -> Allowed<(EdgeTypeId, bool)> {
        match self.path.step(steps_taken) {
            Some(step) => Allowed::only((step.edge_type, step.reverse)),
            None => Allowed::Unknown,
        }
    }

    fn allowed_nodes(&self, _steps_taken: usize) -> Allowed<NodeId> {
        Allowed::Unknown
    }
}

/// Closed set of matcher variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Matcher {
    Empty(EmptyMatcher),
    Path(PathMatcher),
}

impl Default for Matcher {
    fn default() -> Self {
        Matcher::Empty(EmptyMatcher)
    }
}

impl From<PathMatcher> for Matcher {
    fn from(m: PathMatcher) -> Self {
        Matcher::Path(m)
    }
}

impl From<Option<PathMatcher>> for Matcher {
    fn from(m: Option<PathMatcher>) -> Self {
        m.map(Matcher::Path).unwrap_or_default()
    }
}

impl FeatureMatcher for Matcher {
    fn is_finished(&self, steps_taken: usize) -> bool {
        match self {
            Matcher::Empty(m) => m.is_finished(steps_taken),
            Matcher::Path(m) => m.is_finished(steps_taken),
        }
    }

    fn edge_ok(&self, edge_type: EdgeTypeId, reverse: bool, steps_taken: usize) -> bool {
        match self {
            Matcher::Empty(m) => m.edge_ok(edge_type, reverse, steps_taken),
            Matcher::Path(m) => m.edge_ok(edge_type, reverse, steps_taken),
        }
    }

    fn node_ok(&self, node: NodeId, steps_taken: usize) -> bool {
        match self {
            Matcher::Empty(m) => m.node_ok(node, steps_taken),
            Matcher::Path(m) => m.node_ok(node, steps_taken),
        }
    }

    fn allowed_edges(&self, steps_taken: usize) -> Allowed<(EdgeTypeId, bool)> {
        match self {
            Matcher::Empty(m) => m.allowed_edges(steps_taken),
            Matcher::Path(m) => m.allowed_edges(steps_taken),
        }
    }

    fn allowed_nodes(&self, steps_taken: usize) -> Allowed<NodeId> {
        match self {
            Matcher::Empty(m) => m.allowed_nodes(steps_taken),
            Matcher::Path(m) => m.allowed_nodes(steps_taken),
        }
    }
}

// ============================================================================
// Factory
// ============================================================================

/// Cheap shape check done before any vocabulary lookups.
fn looks_like_path_feature(feature: &str) -> bool {
    // `split` would silently accept a trailing `--` as an empty last step.
    let mut tail = feature.chars().rev();
    let doubled_end = tail.next() == Some(PATH_DELIMITER) && tail.next() == Some(PATH_DELIMITER);

    feature.len() > 2
        && feature.starts_with(PATH_DELIMITER)
        && feature.ends_with(PATH_DELIMITER)
        && !doubled_end
}

/// Build a matcher for a plain path feature such as `-born_in-_capital_of-`.
///
/// Returns `Ok(None)` when the text is not a path feature of `graph`: wrong
/// shape, empty steps, or edge-type names the graph does not know. Only
/// failures of the graph lookup itself are returned as errors.
///
/// With `start_from_source == false` the feature was written from the target
/// endpoint and is normalized through [`PathTypeAlgebra::concatenate`].
pub fn create_matcher<G: PathTypeAlgebra + ?Sized>(
    feature: &str,
    start_from_source: bool,
    graph: &G,
) -> Result<Option<PathMatcher>, FeatureError> {
    if !looks_like_path_feature(feature) {
        debug!(feature, "not a plain path feature");
        return Ok(None);
    }

    let parsed = match graph.parse_path(feature) {
        Ok(path) => path,
        Err(err) if err.is_rejection() => {
            debug!(feature, error = %err, "path feature rejected");
            return Ok(None);
        }
        Err(err) => return Err(err),
    };

    let path = if start_from_source {
        parsed
    } else {
        graph.concatenate(&graph.empty_path(), &parsed)
    };
    Ok(Some(PathMatcher::new(path)))
}
