//! Edge-typed graph vocabulary and path-feature matching.
//!
//! Subgraph feature extraction describes the relationship between two nodes
//! by the typed, directed paths that connect them. This crate holds the pieces
//! of that machinery which do not depend on a particular graph store:
//!
//! 1. **Dictionary**: dense `u32` ids for edge-type (relation) names
//! 2. **Path descriptors**: immutable `(edge type, reverse)` step sequences with
//!    a canonical `-a-_b-` text form
//! 3. **Matchers**: stateless step-by-step checks that a traversal realizes a
//!    feature, plus the enumeration hints a walker uses to skip edge scans
//! 4. **Walker**: a reference matcher-driven traversal over [`InMemoryGraph`]
//!
//! ## Module Organization
//!
//! - `graph`: vocabulary / path-type algebra traits and the in-memory graph
//! - `path`: `PathDescriptor` parsing, encoding and concatenation
//! - `matcher`: `FeatureMatcher`, its variants and the `create_matcher` factory
//! - `walk`: node and node-pair enumeration driven by a matcher

pub mod error;
pub mod graph;
pub mod matcher;
pub mod path;
pub mod walk;

use dashmap::DashMap;
use std::sync::atomic::{AtomicU32, Ordering};

pub use error::FeatureError;
pub use graph::{EdgeTypeVocabulary, InMemoryGraph, PathTypeAlgebra};
pub use matcher::{
    create_matcher, Allowed, EmptyMatcher, FeatureMatcher, Matcher, PathMatcher,
};
pub use path::{PathDescriptor, PathStep, PATH_DELIMITER, REVERSE_PREFIX};
pub use walk::{matching_pairs, matching_targets};

/// Dense id of an edge type (relation) in a [`Dictionary`].
pub type EdgeTypeId = u32;

/// Node id in a graph.
pub type NodeId = u32;

// ============================================================================
// Dictionary (name <-> dense id)
// ============================================================================

/// Bidirectional name dictionary.
///
/// Ids are assigned densely in first-seen order starting at 0 and never change
/// once assigned. Interning is safe from several threads at once; a name racing
/// with itself still receives a single id.
pub struct Dictionary {
    /// Name to ID mapping
    name_to_id: DashMap<String, u32>,
    /// ID to name mapping (for reverse lookup)
    id_to_name: DashMap<u32, String>,
    /// Next available ID
    next_id: AtomicU32,
}

impl Dictionary {
    pub fn new() -> Self {
        Self {
            name_to_id: DashMap::new(),
            id_to_name: DashMap::new(),
            next_id: AtomicU32::new(0),
        }
    }

    /// Intern a name, returning its id
    pub fn intern(&self, name: &str) -> u32 {
        if let Some(id) = self.name_to_id.get(name) {
            return *id;
        }

        *self
            .name_to_id
            .entry(name.to_string())
            .or_insert_with(|| {
                let id = self.next_id.fetch_add(1, Ordering::SeqCst);
                self.id_to_name.insert(id, name.to_string());
                id
            })
    }

    /// Look up an existing id without inserting.
    pub fn id_of(&self, name: &str) -> Option<u32> {
        self.name_to_id.get(name).map(|id| *id)
    }

    /// Look up a name by id
    pub fn name_of(&self, id: u32) -> Option<String> {
        self.id_to_name.get(&id).map(|s| s.clone())
    }

    pub fn len(&self) -> usize {
        self.next_id.load(Ordering::SeqCst) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All names in id order.
    pub fn names(&self) -> Vec<String> {
        (0..self.next_id.load(Ordering::SeqCst))
            .filter_map(|id| self.name_of(id))
            .collect()
    }
}

impl Default for Dictionary {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Dictionary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dictionary")
            .field("len", &self.len())
            .finish()
    }
}

impl<S: AsRef<str>> FromIterator<S> for Dictionary {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let dict = Self::new();
        for name in iter {
            dict.intern(name.as_ref());
        }
        dict
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn ids_are_dense_in_first_seen_order() {
        let dict = Dictionary::new();
        assert_eq!(dict.intern("born_in"), 0);
        assert_eq!(dict.intern("lives_in"), 1);
        assert_eq!(dict.intern("born_in"), 0);
        assert_eq!(dict.len(), 2);
        assert_eq!(dict.names(), vec!["born_in", "lives_in"]);
        assert_eq!(dict.name_of(1).as_deref(), Some("lives_in"));
        assert_eq!(dict.id_of("capital_of"), None);
        assert_eq!(dict.name_of(7), None);
    }

    #[test]
    fn concurrent_interning_assigns_one_id_per_name() {
        let dict = Arc::new(Dictionary::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let dict = Arc::clone(&dict);
                std::thread::spawn(move || {
                    (0..50)
                        .map(|i| dict.intern(&format!("r{i}")))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let results: Vec<Vec<u32>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for other in &results[1..] {
            assert_eq!(&results[0], other);
        }
        assert_eq!(dict.len(), 50);
    }
}
