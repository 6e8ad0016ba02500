//! Per-hash-function bucket tables.

use ahash::AHashMap;
use rayon::prelude::*;

use crate::corpus::EmbeddingCorpus;
use crate::hashing::{HashCode, HashFamily};

/// For each hash function, corpus rows grouped by their code.
///
/// Bucket members are row indices into [`EmbeddingCorpus::vectors`]. The codes
/// computed while building are kept so a scan never rehashes corpus rows.
#[derive(Debug, Clone)]
pub struct BucketIndex {
    /// row -> one code per hash function
    codes: Vec<Vec<HashCode>>,
    /// hash function -> code -> rows
    tables: Vec<AHashMap<HashCode, Vec<u32>>>,
}

impl BucketIndex {
    pub fn build(family: &HashFamily, corpus: &EmbeddingCorpus) -> Self {
        let codes: Vec<Vec<HashCode>> = corpus
            .vectors()
            .par_iter()
            .map(|rv| family.hash_vector(&rv.vector))
            .collect();

        let mut tables: Vec<AHashMap<HashCode, Vec<u32>>> =
            vec![AHashMap::new(); family.num_hashes()];
        for (row, row_codes) in codes.iter().enumerate() {
            for (table, &code) in tables.iter_mut().zip(row_codes) {
                table.entry(code).or_default().push(row as u32);
            }
        }

        Self { codes, tables }
    }

    pub fn num_hashes(&self) -> usize {
        self.tables.len()
    }

    /// Rows sharing `code` under hash function `k`.
    ///
    /// A code no row hashed to (or an out-of-range `k`) is an empty bucket,
    /// not an error.
    pub fn bucket(&self, k: usize, code: HashCode) -> &[u32] {
        self.tables
            .get(k)
            .and_then(|table| table.get(&code))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Codes of corpus row `row`, one per hash function.
    pub fn codes_of(&self, row: usize) -> &[HashCode] {
        self.codes.get(row).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of non-empty buckets under hash function `k`.
    pub fn bucket_count(&self, k: usize) -> usize {
        self.tables.get(k).map_or(0, |table| table.len())
    }
}
