//! Checkpointed similarity-matrix runs.
//!
//! Layout under `<embeddings_dir>/<name>/`:
//!
//! ```text
//! embeddings.tsv                  input, relation \t v0 \t ... \t vD-1
//! similarity/in_progress          present while a run is working
//! similarity/params.json          pretty-printed echo of the run parameters
//! similarity/similarity_matrix.tsv  relation_a \t relation_b \t score
//! ```
//!
//! The `in_progress` marker is written before any work and removed only after
//! the matrix is fully written, so a marker left behind means the previous run
//! died. What to do about that is up to the caller.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde_json::Value;
use tracing::info;

use crate::buckets::BucketIndex;
use crate::config::SimilarityConfig;
use crate::corpus::{load_exclusions, EmbeddingCorpus};
use crate::error::{io_at, Result};
use crate::hashing::HashFamily;
use crate::scan::{SimilarityEdge, SimilarityScanner};

pub const EMBEDDINGS_FILE: &str = "embeddings.tsv";
pub const OUTPUT_DIR: &str = "similarity";
pub const IN_PROGRESS_FILE: &str = "in_progress";
pub const PARAMS_FILE: &str = "params.json";
pub const MATRIX_FILE: &str = "similarity_matrix.tsv";

/// Hash, bucket and scan `corpus` in one go.
///
/// Uses `config.seed` for the hyperplane RNG when set, fresh entropy otherwise.
pub fn similarity_edges(corpus: &EmbeddingCorpus, config: &SimilarityConfig) -> Result<Vec<SimilarityEdge>> {
    config.validate()?;
    let mut rng = match config.seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    };

    let family = HashFamily::build(config.num_hashes, config.hash_size, corpus, &mut rng)?;
    let index = BucketIndex::build(&family, corpus);
    let scanner = SimilarityScanner::new(corpus, &index, config.threshold, config.upper_threshold);
    Ok(scanner.scan_all())
}

/// Marker file that exists exactly while a run is working.
struct InProgressMarker {
    path: PathBuf,
}

impl InProgressMarker {
    fn create(path: PathBuf) -> Result<Self> {
        File::create(&path).map_err(io_at(&path))?;
        Ok(Self { path })
    }

    fn finish(self) -> Result<()> {
        fs::remove_file(&self.path).map_err(io_at(&self.path))
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub relations: usize,
    pub edges: usize,
    pub matrix_path: PathBuf,
}

/// One named similarity run inside an embeddings directory.
#[derive(Debug, Clone)]
pub struct SimilarityRun {
    embeddings_dir: PathBuf,
    name: String,
}

impl SimilarityRun {
    pub fn new(embeddings_dir: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            embeddings_dir: embeddings_dir.into(),
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn run_dir(&self) -> PathBuf {
        self.embeddings_dir.join(&self.name)
    }

    pub fn input_path(&self) -> PathBuf {
        self.run_dir().join(EMBEDDINGS_FILE)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.run_dir().join(OUTPUT_DIR)
    }

    pub fn marker_path(&self) -> PathBuf {
        self.output_dir().join(IN_PROGRESS_FILE)
    }

    pub fn params_path(&self) -> PathBuf {
        self.output_dir().join(PARAMS_FILE)
    }

    pub fn matrix_path(&self) -> PathBuf {
        self.output_dir().join(MATRIX_FILE)
    }

    /// A previous run started but never finished.
    pub fn is_interrupted(&self) -> bool {
        self.marker_path().exists()
    }

    /// Relative `"to ignore"` paths are taken relative to the embeddings
    /// directory.
    fn resolve(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.embeddings_dir.join(path)
        }
    }

    /// Run end to end with the JSON parameters `params`.
    ///
    /// Invalid parameters fail before anything is written. Any later failure
    /// leaves the `in_progress` marker in place.
    pub fn execute(&self, params: &Value) -> Result<RunSummary> {
        let config = SimilarityConfig::from_value(params)?;

        let out_dir = self.output_dir();
        fs::create_dir_all(&out_dir).map_err(io_at(&out_dir))?;
        let marker = InProgressMarker::create(self.marker_path())?;

        let params_path = self.params_path();
        let pretty = serde_json::to_string_pretty(params)?;
        fs::write(&params_path, pretty).map_err(io_at(&params_path))?;

        let exclude = match &config.to_ignore {
            Some(path) => load_exclusions(&self.resolve(path))?,
            None => HashSet::new(),
        };

        let corpus = EmbeddingCorpus::load(&self.input_path(), &exclude)?;
        info!(
            run = %self.name,
            relations = corpus.len(),
            dim = corpus.dim(),
            excluded = exclude.len(),
            "loaded embedding corpus"
        );

        let edges = similarity_edges(&corpus, &config)?;
        info!(
            run = %self.name,
            edges = edges.len(),
            num_hashes = config.num_hashes,
            hash_size = config.hash_size,
            "similarity scan complete"
        );

        let matrix_path = self.matrix_path();
        write_matrix(&matrix_path, &corpus, &edges)?;
        marker.finish()?;

        info!(run = %self.name, path = %matrix_path.display(), "wrote similarity matrix");
        Ok(RunSummary {
            relations: corpus.len(),
            edges: edges.len(),
            matrix_path,
        })
    }
}

/// Write `name_a \t name_b \t score` lines.
pub fn write_matrix(path: &Path, corpus: &EmbeddingCorpus, edges: &[SimilarityEdge]) -> Result<()> {
    let file = File::create(path).map_err(io_at(path))?;
    let mut out = BufWriter::new(file);
    for edge in edges {
        let a = corpus.relation_name(edge.source)?;
        let b = corpus.relation_name(edge.target)?;
        writeln!(out, "{a}\t{b}\t{}", edge.score).map_err(io_at(path))?;
    }
    out.flush().map_err(io_at(path))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn write_input(run: &SimilarityRun, text: &str) {
        fs::create_dir_all(run.run_dir()).unwrap();
        fs::write(run.input_path(), text).unwrap();
    }

    #[test]
    fn successful_run_clears_marker_and_echoes_params() {
        let dir = tempdir().unwrap();
        let run = SimilarityRun::new(dir.path(), "fb15k");
        write_input(&run, "r1\t1\t0\nr2\t0.99\t0.14\nr3\t-1\t0\n");

        let params = json!({"threshold": 0.5, "num_hashes": 4, "hash_size": 2, "seed": 5});
        let summary = run.execute(&params).unwrap();

        assert_eq!(summary.relations, 3);
        assert!(!run.is_interrupted());
        let echoed: Value =
            serde_json::from_str(&fs::read_to_string(run.params_path()).unwrap()).unwrap();
        assert_eq!(echoed, params);
        assert!(summary.matrix_path.exists());
    }

    #[test]
    fn failed_run_leaves_marker() {
        let dir = tempdir().unwrap();
        let run = SimilarityRun::new(dir.path(), "broken");
        write_input(&run, "r1\t1\t0\nr2\toops\t0\n");

        let err = run
            .execute(&json!({"threshold": 0.5, "num_hashes": 4, "hash_size": 2}))
            .unwrap_err();
        assert!(err.to_string().contains("line 2"), "unexpected error: {err}");
        assert!(run.is_interrupted());
    }

    #[test]
    fn invalid_params_write_nothing() {
        let dir = tempdir().unwrap();
        let run = SimilarityRun::new(dir.path(), "noconf");
        write_input(&run, "r1\t1\t0\n");

        assert!(run.execute(&json!({"threshold": 0.5})).is_err());
        assert!(!run.output_dir().exists());
    }

    #[test]
    fn ignore_list_resolves_against_embeddings_dir() {
        let dir = tempdir().unwrap();
        let run = SimilarityRun::new(dir.path(), "ignoring");
        write_input(&run, "r1\t1\t0\nr2\t0.99\t0.14\nr3\t0.98\t0.2\n");
        fs::write(dir.path().join("ignore.txt"), "r3\n\n").unwrap();

        let summary = run
            .execute(&json!({
                "threshold": 0.5, "num_hashes": 6, "hash_size": 1, "seed": 1,
                "to ignore": "ignore.txt"
            }))
            .unwrap();
        assert_eq!(summary.relations, 2);
        let matrix = fs::read_to_string(run.matrix_path()).unwrap();
        assert!(!matrix.contains("r3"));
    }
}
