//! Random-hyperplane hash functions.
//!
//! Each hash function is `hash_size` unit hyperplanes; a vector's code has one
//! bit per hyperplane (1 when the dot product is positive), most significant
//! bit first. Hyperplane component `i` is drawn from `N(mean_i, std_i)` where
//! `mean_i` / `std_i` are the corpus's own per-dimension statistics, so cuts
//! follow the spread of this embedding space instead of isotropic directions.

use rand::Rng;
use rand_distr::{Distribution, Normal};
use tracing::debug;

use crate::config::MAX_HASH_SIZE;
use crate::corpus::{normalize_in_place, EmbeddingCorpus};
use crate::error::{Result, SimilarityError};

/// Bucket key produced by one hash function.
pub type HashCode = u64;

pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Per-dimension mean and (sample) standard deviation.
#[derive(Debug, Clone, PartialEq)]
pub struct DimensionStats {
    pub mean: Vec<f64>,
    pub std_dev: Vec<f64>,
}

impl DimensionStats {
    pub fn of(corpus: &EmbeddingCorpus) -> Self {
        let dim = corpus.dim();
        let n = corpus.len();
        let mut mean = vec![0.0; dim];
        let mut std_dev = vec![0.0; dim];
        if n == 0 {
            return Self { mean, std_dev };
        }

        for rv in corpus.vectors() {
            for (m, x) in mean.iter_mut().zip(&rv.vector) {
                *m += x;
            }
        }
        for m in mean.iter_mut() {
            *m /= n as f64;
        }

        if n > 1 {
            for rv in corpus.vectors() {
                for ((s, m), x) in std_dev.iter_mut().zip(&mean).zip(&rv.vector) {
                    *s += (x - m) * (x - m);
                }
            }
            for s in std_dev.iter_mut() {
                *s = (*s / (n - 1) as f64).sqrt();
            }
        }

        Self { mean, std_dev }
    }
}

/// One hash function: an ordered list of unit hyperplanes.
#[derive(Debug, Clone, PartialEq)]
pub struct HashFunction {
    hyperplanes: Vec<Vec<f64>>,
}

impl HashFunction {
    pub fn new(hyperplanes: Vec<Vec<f64>>) -> Self {
        Self { hyperplanes }
    }

    pub fn hyperplanes(&self) -> &[Vec<f64>] {
        &self.hyperplanes
    }

    pub fn hash(&self, vector: &[f64]) -> HashCode {
        self.hyperplanes.iter().fold(0, |code, plane| {
            (code << 1) | HashCode::from(dot(vector, plane) > 0.0)
        })
    }
}

/// `num_hashes` independent hash functions, fixed once built.
#[derive(Debug, Clone, PartialEq)]
pub struct HashFamily {
    functions: Vec<HashFunction>,
}

impl HashFamily {
    pub fn build<R: Rng + ?Sized>(
        num_hashes: usize,
        hash_size: usize,
        corpus: &EmbeddingCorpus,
        rng: &mut R,
    ) -> Result<Self> {
        if hash_size > MAX_HASH_SIZE {
            return Err(SimilarityError::InvalidConfig(format!(
                "hash_size must be at most {MAX_HASH_SIZE}, got {hash_size}"
            )));
        }

        let stats = DimensionStats::of(corpus);
        let dims = stats
            .mean
            .iter()
            .zip(&stats.std_dev)
            .enumerate()
            .map(|(dim, (&mean, &std_dev))| {
                Normal::new(mean, std_dev).map_err(|e| SimilarityError::Sampling {
                    dim,
                    message: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let functions = (0..num_hashes)
            .map(|_| {
                let hyperplanes = (0..hash_size)
                    .map(|_| {
                        let mut plane: Vec<f64> = dims.iter().map(|d| d.sample(rng)).collect();
                        normalize_in_place(&mut plane);
                        plane
                    })
                    .collect();
                HashFunction::new(hyperplanes)
            })
            .collect();

        debug!(num_hashes, hash_size, dim = corpus.dim(), "built hash family");
        Ok(Self { functions })
    }

    pub fn from_functions(functions: Vec<HashFunction>) -> Self {
        Self { functions }
    }

    pub fn functions(&self) -> &[HashFunction] {
        &self.functions
    }

    pub fn num_hashes(&self) -> usize {
        self.functions.len()
    }

    /// One code per hash function, in family order.
    pub fn hash_vector(&self, vector: &[f64]) -> Vec<HashCode> {
        self.functions.iter().map(|f| f.hash(vector)).collect()
    }
}
