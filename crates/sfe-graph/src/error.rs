use crate::EdgeTypeId;

/// Failure to turn feature text into a path descriptor (or back).
#[derive(Debug, thiserror::Error)]
pub enum FeatureError {
    #[error("feature {text:?} must begin and end with '{delimiter}'")]
    MissingDelimiter { text: String, delimiter: char },

    #[error("feature {text:?} has an empty step at position {position}")]
    EmptyStep { text: String, position: usize },

    #[error("unknown edge type {name:?}")]
    UnknownEdgeType { name: String },

    #[error("unknown edge type id {id}")]
    UnknownEdgeTypeId { id: EdgeTypeId },

    /// The vocabulary itself failed (I/O-backed graphs, remote lookups, ...).
    #[error(transparent)]
    Lookup(#[from] anyhow::Error),
}

impl FeatureError {
    /// Whether this is an ordinary "this text is not a path feature of this
    /// graph" outcome rather than a failure of the underlying graph.
    pub fn is_rejection(&self) -> bool {
        !matches!(self, FeatureError::Lookup(_))
    }
}
