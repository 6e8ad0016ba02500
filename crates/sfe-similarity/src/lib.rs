//! Approximate all-pairs similarity over relation embeddings.
//!
//! Exact all-pairs cosine similarity is O(n²) in the number of relations.
//! Instead, relations are hashed with random hyperplanes (LSH): vectors that
//! point in similar directions tend to land in the same bucket, and only
//! bucket-mates are scored exactly.
//!
//! Pipeline:
//!
//! ```text
//! EmbeddingCorpus ──► HashFamily ──► BucketIndex ──► SimilarityScanner ──► edges
//!   (load+normalize)    (sample)      (hash, group)    (parallel scan)
//! ```
//!
//! Hash-family and bucket construction finish before the scan starts; the
//! scan itself is data-parallel over corpus rows with no shared mutable state.
//! [`SimilarityRun`] wraps the pipeline with the on-disk run layout and the
//! `in_progress` checkpoint marker.

pub mod buckets;
pub mod config;
pub mod corpus;
pub mod error;
pub mod hashing;
pub mod run;
pub mod scan;

pub use buckets::BucketIndex;
pub use config::{SimilarityConfig, DEFAULT_UPPER_THRESHOLD};
pub use corpus::{load_exclusions, EmbeddingCorpus, RelationVector};
pub use error::{Result, SimilarityError};
pub use hashing::{dot, DimensionStats, HashCode, HashFamily, HashFunction};
pub use run::{similarity_edges, write_matrix, RunSummary, SimilarityRun};
pub use scan::{SimilarityEdge, SimilarityScanner};
