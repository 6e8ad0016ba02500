//! Matcher-driven traversal over an [`InMemoryGraph`].
//!
//! At each step the walker asks the matcher whether the admissible edges can be
//! enumerated. If so it probes exactly those `(edge type, direction)` pairs;
//! otherwise it scans every edge type present at the node and filters with
//! `edge_ok`. High out-degree nodes are cheap under selective features this way.

use roaring::RoaringBitmap;

use crate::graph::InMemoryGraph;
use crate::matcher::{Allowed, FeatureMatcher};
use crate::NodeId;

/// Nodes reachable from `source` by a traversal the matcher accepts.
///
/// The matcher must finish after finitely many accepted steps; a matcher that
/// never finishes is only safe if it eventually rejects every edge.
pub fn matching_targets<M: FeatureMatcher + ?Sized>(
    graph: &InMemoryGraph,
    source: NodeId,
    matcher: &M,
) -> RoaringBitmap {
    let mut frontier = RoaringBitmap::new();
    frontier.insert(source);
    let mut steps_taken = 0usize;

    while !matcher.is_finished(steps_taken) {
        if frontier.is_empty() {
            return frontier;
        }

        let mut next = RoaringBitmap::new();
        match matcher.allowed_edges(steps_taken) {
            Allowed::Only(edges) => {
                for node in frontier.iter() {
                    for &(edge_type, reverse) in &edges {
                        if let Some(reached) = graph.neighbors(node, edge_type, reverse) {
                            next |= reached;
                        }
                    }
                }
            }
            Allowed::Unknown => {
                for node in frontier.iter() {
                    for reverse in [false, true] {
                        for edge_type in graph.edge_types_at(node, reverse) {
                            if !matcher.edge_ok(edge_type, reverse, steps_taken) {
                                continue;
                            }
                            if let Some(reached) = graph.neighbors(node, edge_type, reverse) {
                                next |= reached;
                            }
                        }
                    }
                }
            }
        }

        steps_taken += 1;
        let allowed_nodes = matcher.allowed_nodes(steps_taken);
        frontier = match allowed_nodes.as_set() {
            Some(nodes) => next & nodes.iter().copied().collect::<RoaringBitmap>(),
            None => next
                .into_iter()
                .filter(|&node| matcher.node_ok(node, steps_taken))
                .collect(),
        };
    }

    frontier
}

/// Every `(source, target)` pair of `graph` the matcher accepts.
pub fn matching_pairs<M: FeatureMatcher + ?Sized>(
    graph: &InMemoryGraph,
    matcher: &M,
) -> Vec<(NodeId, NodeId)> {
    (0..graph.node_count())
        .flat_map(|source| {
            matching_targets(graph, source, matcher)
                .into_iter()
                .map(move |target| (source, target))
        })
        .collect()
}
