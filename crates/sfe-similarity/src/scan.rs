//! Candidate scan and exact scoring.
//!
//! A row's candidates are every other row sharing at least one bucket with it
//! under any hash function. Candidates are scored exactly (vectors are unit
//! length, so cosine is the dot product) and kept when the score lies strictly
//! inside `(threshold, upper_threshold)`.
//!
//! Pairs are reported from the scanning row's side and are not canonicalized:
//! `(a, b)` and `(b, a)` both appear when each finds the other.

use rayon::prelude::*;
use roaring::RoaringBitmap;
use serde::{Deserialize, Serialize};

use crate::buckets::BucketIndex;
use crate::corpus::EmbeddingCorpus;
use crate::hashing::dot;

/// One accepted similarity fact.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityEdge {
    pub source: u32,
    pub target: u32,
    pub score: f64,
}

pub struct SimilarityScanner<'a> {
    corpus: &'a EmbeddingCorpus,
    index: &'a BucketIndex,
    threshold: f64,
    upper_threshold: f64,
}

impl<'a> SimilarityScanner<'a> {
    pub fn new(
        corpus: &'a EmbeddingCorpus,
        index: &'a BucketIndex,
        threshold: f64,
        upper_threshold: f64,
    ) -> Self {
        Self {
            corpus,
            index,
            threshold,
            upper_threshold,
        }
    }

    /// Rows colliding with `row` under at least one hash function, `row`
    /// itself excluded.
    pub fn candidates(&self, row: usize) -> RoaringBitmap {
        let mut out = RoaringBitmap::new();
        for (k, &code) in self.index.codes_of(row).iter().enumerate() {
            out.extend(self.index.bucket(k, code).iter().copied());
        }
        out.remove(row as u32);
        out
    }

    /// Accepted edges from corpus row `row` to its candidates.
    pub fn compute_similarities(&self, row: usize) -> Vec<SimilarityEdge> {
        let vectors = self.corpus.vectors();
        let Some(query) = vectors.get(row) else {
            return Vec::new();
        };

        self.candidates(row)
            .into_iter()
            .filter_map(|other| {
                let candidate = vectors.get(other as usize)?;
                if candidate.id == query.id {
                    return None;
                }
                let score = dot(&query.vector, &candidate.vector);
                (self.threshold < score && score < self.upper_threshold).then_some(SimilarityEdge {
                    source: query.id,
                    target: candidate.id,
                    score,
                })
            })
            .collect()
    }

    /// Scan every corpus row on the rayon pool; worker results are
    /// concatenated.
    pub fn scan_all(&self) -> Vec<SimilarityEdge> {
        (0..self.corpus.len())
            .into_par_iter()
            .flat_map_iter(|row| self.compute_similarities(row))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashing::{HashFamily, HashFunction};
    use std::collections::HashSet;

    fn corpus() -> EmbeddingCorpus {
        EmbeddingCorpus::from_rows(
            vec![
                ("r1", vec![1.0, 0.0]),
                ("r2", vec![0.99, 0.14]),
                ("r3", vec![-1.0, 0.0]),
                ("r4", vec![1.0, 0.0]),
            ],
            &HashSet::new(),
        )
        .unwrap()
    }

    fn family() -> HashFamily {
        HashFamily::from_functions(vec![
            HashFunction::new(vec![vec![1.0, 0.0]]),
            HashFunction::new(vec![vec![0.0, 1.0]]),
        ])
    }

    #[test]
    fn candidates_union_buckets_without_self() {
        let c = corpus();
        let index = BucketIndex::build(&family(), &c);
        let scanner = SimilarityScanner::new(&c, &index, 0.5, 0.9999);
        // r1: codes [1, 0]; shares h0 with r2, r4 and h1 with r3, r4.
        assert_eq!(scanner.candidates(0).iter().collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn keeps_only_band_members() {
        let c = corpus();
        let index = BucketIndex::build(&family(), &c);
        let scanner = SimilarityScanner::new(&c, &index, 0.5, 0.9999);
        let edges = scanner.compute_similarities(0);

        // r2 is close, r3 opposite, r4 identical (above the upper bound).
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].source, 0);
        assert_eq!(edges[0].target, 1);
        assert!(edges[0].score > 0.99 && edges[0].score < 0.991);
    }

    #[test]
    fn symmetric_pairs_are_reported_from_both_sides() {
        let c = corpus();
        let index = BucketIndex::build(&family(), &c);
        let scanner = SimilarityScanner::new(&c, &index, 0.5, 0.9999);
        let edges = scanner.scan_all();

        let pairs: HashSet<(u32, u32)> = edges.iter().map(|e| (e.source, e.target)).collect();
        assert_eq!(
            pairs,
            HashSet::from([(0, 1), (1, 0), (3, 1), (1, 3)])
        );
        assert_eq!(edges.len(), 4);
    }

    #[test]
    fn out_of_range_row_is_empty() {
        let c = corpus();
        let index = BucketIndex::build(&family(), &c);
        let scanner = SimilarityScanner::new(&c, &index, 0.5, 0.9999);
        assert!(scanner.compute_similarities(99).is_empty());
    }

    #[test]
    fn index_from_a_larger_corpus_is_tolerated() {
        let c = corpus();
        let index = BucketIndex::build(&family(), &c);
        let smaller =
            EmbeddingCorpus::from_rows(vec![("r1", vec![1.0, 0.0])], &HashSet::new()).unwrap();
        let scanner = SimilarityScanner::new(&smaller, &index, 0.5, 0.9999);
        assert!(scanner.compute_similarities(0).is_empty());
        assert!(scanner.scan_all().is_empty());
    }
}
