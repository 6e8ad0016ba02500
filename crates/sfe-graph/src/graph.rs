//! Graph-side collaborators of the matcher subsystem.
//!
//! Matchers only need two things from a graph: a way to resolve edge-type
//! names, and the path-type algebra used to normalize features to a single
//! direction. Both are traits so that a disk- or service-backed graph can
//! provide them; [`InMemoryGraph`] is the in-process implementation used by the
//! walker and the tests.

use std::collections::BTreeSet;

use ahash::AHashMap;
use anyhow::Result;
use roaring::RoaringBitmap;

use crate::path::PathDescriptor;
use crate::{Dictionary, EdgeTypeId, FeatureError, NodeId};

/// Edge-type name <-> id resolution.
///
/// An unknown name is `Ok(None)`; `Err` is reserved for lookups that could not
/// be performed at all.
pub trait EdgeTypeVocabulary {
    fn edge_type_id(&self, name: &str) -> Result<Option<EdgeTypeId>>;

    fn edge_type_name(&self, id: EdgeTypeId) -> Result<Option<String>>;
}

/// Construction and combination of path descriptors for one graph.
pub trait PathTypeAlgebra: EdgeTypeVocabulary {
    fn empty_path(&self) -> PathDescriptor {
        PathDescriptor::empty()
    }

    fn parse_path(&self, text: &str) -> std::result::Result<PathDescriptor, FeatureError> {
        PathDescriptor::parse(text, self)
    }

    /// Join a path walked out from the source with a path walked out from the
    /// target into one source-rooted path.
    ///
    /// `from_target` was discovered starting at the target, so it is appended
    /// inverted: steps in reverse order, each reverse flag flipped.
    fn concatenate(&self, to_source: &PathDescriptor, from_target: &PathDescriptor) -> PathDescriptor {
        to_source.concat(&from_target.inverse())
    }
}

impl EdgeTypeVocabulary for Dictionary {
    fn edge_type_id(&self, name: &str) -> Result<Option<EdgeTypeId>> {
        Ok(self.id_of(name))
    }

    fn edge_type_name(&self, id: EdgeTypeId) -> Result<Option<String>> {
        Ok(self.name_of(id))
    }
}

impl PathTypeAlgebra for Dictionary {}

// ============================================================================
// In-memory multigraph
// ============================================================================

/// Directed, edge-typed multigraph held in memory.
///
/// Adjacency is indexed per `(node, edge type)` in both directions. Repeated
/// edges with the same `(source, type, target)` collapse into one.
#[derive(Debug, Default)]
pub struct InMemoryGraph {
    edge_types: Dictionary,
    node_count: u32,
    edge_count: usize,
    /// (source, edge_type) -> targets
    outgoing: AHashMap<(NodeId, EdgeTypeId), RoaringBitmap>,
    /// (target, edge_type) -> sources
    incoming: AHashMap<(NodeId, EdgeTypeId), RoaringBitmap>,
    out_types: AHashMap<NodeId, BTreeSet<EdgeTypeId>>,
    in_types: AHashMap<NodeId, BTreeSet<EdgeTypeId>>,
}

impl InMemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a fresh node, returning its id.
    pub fn add_node(&mut self) -> NodeId {
        let id = self.node_count;
        self.node_count += 1;
        id
    }

    /// Add a typed edge. Node ids beyond the current count grow the graph.
    pub fn add_edge(&mut self, source: NodeId, edge_type: &str, target: NodeId) -> EdgeTypeId {
        let edge_type = self.edge_types.intern(edge_type);
        self.node_count = self.node_count.max(source.max(target) + 1);

        let inserted = self
            .outgoing
            .entry((source, edge_type))
            .or_default()
            .insert(target);
        if inserted {
            self.edge_count += 1;
        }
        self.incoming
            .entry((target, edge_type))
            .or_default()
            .insert(source);
        self.out_types.entry(source).or_default().insert(edge_type);
        self.in_types.entry(target).or_default().insert(edge_type);
        edge_type
    }

    pub fn node_count(&self) -> u32 {
        self.node_count
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn edge_types(&self) -> &Dictionary {
        &self.edge_types
    }

    /// Edge types present at `node`: outgoing ones, or incoming ones when
    /// `reverse` is set.
    pub fn edge_types_at(&self, node: NodeId, reverse: bool) -> impl Iterator<Item = EdgeTypeId> + '_ {
        let types = if reverse {
            self.in_types.get(&node)
        } else {
            self.out_types.get(&node)
        };
        types.into_iter().flat_map(|set| set.iter().copied())
    }

    /// Nodes reached from `node` over one `edge_type` edge, walking it
    /// backwards when `reverse` is set.
    pub fn neighbors(&self, node: NodeId, edge_type: EdgeTypeId, reverse: bool) -> Option<&RoaringBitmap> {
        if reverse {
            self.incoming.get(&(node, edge_type))
        } else {
            self.outgoing.get(&(node, edge_type))
        }
    }

    pub fn has_edge(&self, source: NodeId, edge_type: &str, target: NodeId) -> bool {
        self.edge_types
            .id_of(edge_type)
            .and_then(|id| self.neighbors(source, id, false))
            .is_some_and(|targets| targets.contains(target))
    }
}

impl EdgeTypeVocabulary for InMemoryGraph {
    fn edge_type_id(&self, name: &str) -> Result<Option<EdgeTypeId>> {
        Ok(self.edge_types.id_of(name))
    }

    fn edge_type_name(&self, id: EdgeTypeId) -> Result<Option<String>> {
        Ok(self.edge_types.name_of(id))
    }
}

impl PathTypeAlgebra for InMemoryGraph {}
