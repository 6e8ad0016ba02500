//! Path descriptors: typed, directed edge sequences.
//!
//! Text form: steps separated by [`PATH_DELIMITER`], with a delimiter at both
//! ends. A step is an edge-type name; [`REVERSE_PREFIX`] marks a step taken
//! against the edge direction. `-born_in-_capital_of-` is "follow `born_in`,
//! then walk a `capital_of` edge backwards". The empty path is `-`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::graph::EdgeTypeVocabulary;
use crate::{EdgeTypeId, FeatureError};

pub const PATH_DELIMITER: char = '-';
pub const REVERSE_PREFIX: char = '_';

/// One hop of a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PathStep {
    pub edge_type: EdgeTypeId,
    pub reverse: bool,
}

impl PathStep {
    pub const fn new(edge_type: EdgeTypeId, reverse: bool) -> Self {
        Self { edge_type, reverse }
    }

    pub const fn inverse(self) -> Self {
        Self {
            edge_type: self.edge_type,
            reverse: !self.reverse,
        }
    }
}

/// Immutable sequence of [`PathStep`]s.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PathDescriptor {
    steps: Box<[PathStep]>,
}

impl PathDescriptor {
    /// The concatenation identity.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(steps: Vec<PathStep>) -> Self {
        Self {
            steps: steps.into_boxed_slice(),
        }
    }

    pub fn num_hops(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    pub fn step(&self, k: usize) -> Option<PathStep> {
        self.steps.get(k).copied()
    }

    pub fn edge_type(&self, k: usize) -> Option<EdgeTypeId> {
        self.step(k).map(|s| s.edge_type)
    }

    pub fn is_reverse(&self, k: usize) -> Option<bool> {
        self.step(k).map(|s| s.reverse)
    }

    /// `self` followed by `other`.
    pub fn concat(&self, other: &PathDescriptor) -> PathDescriptor {
        let mut steps = Vec::with_capacity(self.num_hops() + other.num_hops());
        steps.extend_from_slice(&self.steps);
        steps.extend_from_slice(&other.steps);
        Self::new(steps)
    }

    /// The same path walked from its other end.
    pub fn inverse(&self) -> PathDescriptor {
        Self::new(self.steps.iter().rev().map(|s| s.inverse()).collect())
    }

    /// Parse the canonical text form, resolving names through `vocab`.
    pub fn parse<V: EdgeTypeVocabulary + ?Sized>(text: &str, vocab: &V) -> Result<Self, FeatureError> {
        if text.len() == 1 && text.starts_with(PATH_DELIMITER) {
            return Ok(Self::empty());
        }

        let body = text
            .strip_prefix(PATH_DELIMITER)
            .and_then(|rest| rest.strip_suffix(PATH_DELIMITER))
            .ok_or_else(|| FeatureError::MissingDelimiter {
                text: text.to_string(),
                delimiter: PATH_DELIMITER,
            })?;

        let mut steps = Vec::new();
        for (position, token) in body.split(PATH_DELIMITER).enumerate() {
            let (name, reverse) = match token.strip_prefix(REVERSE_PREFIX) {
                Some(name) => (name, true),
                None => (token, false),
            };
            if name.is_empty() {
                return Err(FeatureError::EmptyStep {
                    text: text.to_string(),
                    position,
                });
            }
            let edge_type = vocab
                .edge_type_id(name)?
                .ok_or_else(|| FeatureError::UnknownEdgeType {
                    name: name.to_string(),
                })?;
            steps.push(PathStep::new(edge_type, reverse));
        }

        Ok(Self::new(steps))
    }

    /// Canonical text form with edge-type names from `vocab`.
    pub fn encode<V: EdgeTypeVocabulary + ?Sized>(&self, vocab: &V) -> Result<String, FeatureError> {
        let mut out = String::from(PATH_DELIMITER);
        for step in self.steps.iter() {
            let name = vocab
                .edge_type_name(step.edge_type)?
                .ok_or(FeatureError::UnknownEdgeTypeId { id: step.edge_type })?;
            if step.reverse {
                out.push(REVERSE_PREFIX);
            }
            out.push_str(&name);
            out.push(PATH_DELIMITER);
        }
        Ok(out)
    }
}

/// Numeric rendering (`-3-_7-`), for logs where no vocabulary is at hand.
impl fmt::Display for PathDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{PATH_DELIMITER}")?;
        for step in self.steps.iter() {
            if step.reverse {
                write!(f, "{REVERSE_PREFIX}")?;
            }
            write!(f, "{}{PATH_DELIMITER}", step.edge_type)?;
        }
        Ok(())
    }
}
