//! Relation embedding corpus.
//!
//! Input format: one relation per line, tab separated,
//! `relation_name \t v0 \t v1 \t ... \t vD-1`. Every vector is normalized to
//! unit length on load; zero vectors have no direction and are dropped.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use sfe_graph::Dictionary;
use tracing::{debug, warn};

use crate::error::{io_at, Result, SimilarityError};

/// A unit-length relation vector.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationVector {
    pub id: u32,
    pub vector: Vec<f64>,
}

/// Normalize in place, returning the original norm.
///
/// Components are scaled by the largest magnitude before squaring, so rows of
/// finite values never overflow or underflow to a zero norm. The returned
/// norm may itself be `inf` for huge rows; it is 0 only for all-zero input.
pub fn normalize_in_place(v: &mut [f64]) -> f64 {
    let scale = v.iter().fold(0.0f64, |m, x| m.max(x.abs()));
    if scale == 0.0 {
        return 0.0;
    }
    let scaled_norm = v
        .iter()
        .map(|x| {
            let s = x / scale;
            s * s
        })
        .sum::<f64>()
        .sqrt();
    for x in v.iter_mut() {
        *x = *x / scale / scaled_norm;
    }
    scale * scaled_norm
}

/// Loaded relation vectors with their name dictionary.
///
/// Relation ids are assigned in file order to the relations that survive
/// filtering, so `vectors()[i].id == i`.
#[derive(Debug, Default)]
pub struct EmbeddingCorpus {
    dictionary: Dictionary,
    vectors: Vec<RelationVector>,
    dim: usize,
}

impl EmbeddingCorpus {
    pub fn load(path: &Path, exclude: &HashSet<String>) -> Result<Self> {
        let file = File::open(path).map_err(io_at(path))?;
        Self::from_reader(BufReader::new(file), exclude)
    }

    pub fn parse_str(text: &str, exclude: &HashSet<String>) -> Result<Self> {
        Self::from_reader(text.as_bytes(), exclude)
    }

    pub fn from_reader<R: BufRead>(reader: R, exclude: &HashSet<String>) -> Result<Self> {
        let mut corpus = Self::default();
        let mut expected_dim: Option<usize> = None;

        for (idx, line) in reader.lines().enumerate() {
            let line_no = idx + 1;
            let line = line?;
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }

            let (name, vector) = parse_row(line, line_no)?;
            match expected_dim {
                None => expected_dim = Some(vector.len()),
                Some(dim) if dim != vector.len() => {
                    return Err(SimilarityError::MalformedRow {
                        line: line_no,
                        message: format!(
                            "expected {} fields, found {}",
                            dim + 1,
                            vector.len() + 1
                        ),
                    });
                }
                Some(_) => {}
            }

            if exclude.contains(name) {
                continue;
            }
            corpus.push(name, vector, line_no);
        }

        corpus.dim = expected_dim.unwrap_or(0);
        Ok(corpus)
    }

    /// Build from in-memory rows. All rows must share one dimensionality.
    pub fn from_rows<S, I>(rows: I, exclude: &HashSet<String>) -> Result<Self>
    where
        S: AsRef<str>,
        I: IntoIterator<Item = (S, Vec<f64>)>,
    {
        let mut corpus = Self::default();
        let mut expected_dim: Option<usize> = None;
        for (idx, (name, vector)) in rows.into_iter().enumerate() {
            let row = idx + 1;
            if vector.is_empty() || vector.iter().any(|x| !x.is_finite()) {
                return Err(SimilarityError::MalformedRow {
                    line: row,
                    message: "vector must be non-empty and finite".to_string(),
                });
            }
            if *expected_dim.get_or_insert(vector.len()) != vector.len() {
                return Err(SimilarityError::MalformedRow {
                    line: row,
                    message: format!("dimension {} differs from first row", vector.len()),
                });
            }
            if exclude.contains(name.as_ref()) {
                continue;
            }
            corpus.push(name.as_ref(), vector, row);
        }
        corpus.dim = expected_dim.unwrap_or(0);
        Ok(corpus)
    }

    fn push(&mut self, name: &str, mut vector: Vec<f64>, line_no: usize) {
        if self.dictionary.id_of(name).is_some() {
            warn!(relation = name, line = line_no, "duplicate relation row skipped");
            return;
        }
        if normalize_in_place(&mut vector) <= 0.0 {
            debug!(relation = name, "zero-magnitude relation vector dropped");
            return;
        }
        let id = self.dictionary.intern(name);
        self.vectors.push(RelationVector { id, vector });
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Dimensionality of the input rows (0 for an empty input).
    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn vectors(&self) -> &[RelationVector] {
        &self.vectors
    }

    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    pub fn relation_name(&self, id: u32) -> Result<String> {
        self.dictionary
            .name_of(id)
            .ok_or(SimilarityError::UnknownRelation(id))
    }

    pub fn get(&self, name: &str) -> Option<&RelationVector> {
        self.dictionary
            .id_of(name)
            .and_then(|id| self.vectors.get(id as usize))
    }
}

fn parse_row(line: &str, line_no: usize) -> Result<(&str, Vec<f64>)> {
    let mut fields = line.split('\t');
    let name = fields.next().unwrap_or_default();
    if name.is_empty() {
        return Err(SimilarityError::MalformedRow {
            line: line_no,
            message: "missing relation name".to_string(),
        });
    }

    let vector = fields
        .map(|field| {
            field
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|x| x.is_finite())
                .ok_or_else(|| SimilarityError::MalformedRow {
                    line: line_no,
                    message: format!("invalid vector component {field:?}"),
                })
        })
        .collect::<Result<Vec<f64>>>()?;

    if vector.is_empty() {
        return Err(SimilarityError::MalformedRow {
            line: line_no,
            message: "expected a relation name and at least one component".to_string(),
        });
    }
    Ok((name, vector))
}

/// Relation names to exclude: one per line, blank lines ignored.
pub fn load_exclusions(path: &Path) -> Result<HashSet<String>> {
    let text = std::fs::read_to_string(path).map_err(io_at(path))?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn normalizes_and_assigns_ids_in_order() {
        let corpus = EmbeddingCorpus::parse_str("r1\t3\t4\nr2\t0\t2\n", &HashSet::new()).unwrap();
        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.dim(), 2);
        let r1 = corpus.get("r1").unwrap();
        assert_eq!(r1.id, 0);
        assert_abs_diff_eq!(r1.vector[0], 0.6, epsilon = 1e-12);
        assert_abs_diff_eq!(r1.vector[1], 0.8, epsilon = 1e-12);
        assert_eq!(corpus.get("r2").unwrap().vector, vec![0.0, 1.0]);
        assert_eq!(corpus.relation_name(1).unwrap(), "r2");
    }

    #[test]
    fn drops_zero_vectors_and_excluded_relations() {
        let exclude = HashSet::from(["skip".to_string()]);
        let corpus =
            EmbeddingCorpus::parse_str("zero\t0\t0\nskip\t1\t1\nkeep\t1\t0\n\n", &exclude).unwrap();
        assert_eq!(corpus.len(), 1);
        assert_eq!(corpus.get("keep").unwrap().id, 0);
        assert!(corpus.get("zero").is_none());
        assert!(corpus.get("skip").is_none());
    }

    #[test]
    fn extreme_magnitudes_still_normalize() {
        let corpus =
            EmbeddingCorpus::parse_str("big\t1e200\t1e200\nsmall\t1e-170\t0\n", &HashSet::new())
                .unwrap();
        assert_eq!(corpus.len(), 2);

        let big = &corpus.get("big").unwrap().vector;
        assert_abs_diff_eq!(big[0], std::f64::consts::FRAC_1_SQRT_2, epsilon = 1e-12);
        assert_abs_diff_eq!(big[1], std::f64::consts::FRAC_1_SQRT_2, epsilon = 1e-12);
        assert_eq!(corpus.get("small").unwrap().vector, vec![1.0, 0.0]);

        for rv in corpus.vectors() {
            let norm2: f64 = rv.vector.iter().map(|x| x * x).sum();
            assert_abs_diff_eq!(norm2, 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn keeps_first_of_duplicate_rows() {
        let corpus = EmbeddingCorpus::parse_str("r\t1\t0\nr\t0\t1\n", &HashSet::new()).unwrap();
        assert_eq!(corpus.len(), 1);
        assert_eq!(corpus.get("r").unwrap().vector, vec![1.0, 0.0]);
    }

    #[test]
    fn malformed_rows_are_fatal() {
        let none = HashSet::new();
        for (text, line) in [
            ("r1\n", 1),
            ("r1\t1\t0\nr2\t1\n", 2),
            ("r1\t1\tx\n", 1),
            ("r1\t1\tNaN\n", 1),
            ("\t1\t0\n", 1),
        ] {
            match EmbeddingCorpus::parse_str(text, &none) {
                Err(SimilarityError::MalformedRow { line: got, .. }) => assert_eq!(got, line, "{text:?}"),
                other => panic!("expected malformed row for {text:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn from_rows_matches_text_loading() {
        let corpus = EmbeddingCorpus::from_rows(
            vec![("a", vec![2.0, 0.0]), ("b", vec![0.0, 0.0])],
            &HashSet::new(),
        )
        .unwrap();
        assert_eq!(corpus.len(), 1);
        assert_eq!(corpus.get("a").unwrap().vector, vec![1.0, 0.0]);
        assert!(EmbeddingCorpus::from_rows(
            vec![("a", vec![1.0]), ("b", vec![1.0, 2.0])],
            &HashSet::new()
        )
        .is_err());
    }
}
