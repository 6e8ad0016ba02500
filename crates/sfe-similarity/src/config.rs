//! Run parameters, read from the JSON `params` object of a similarity run.
//!
//! Recognized keys:
//! - `threshold` (required): lower similarity bound, exclusive
//! - `num_hashes` (required): number of independent hash functions
//! - `hash_size` (required): hyperplanes (bits) per hash function, 1..=64
//! - `"to ignore"` (optional): path to a newline-delimited list of relation
//!   names to exclude
//! - `upper_threshold` (optional, default [`DEFAULT_UPPER_THRESHOLD`]): upper
//!   similarity bound, exclusive; near-duplicates above it are dropped
//! - `seed` (optional): fixes the hyperplane RNG
//!
//! Unrecognized keys are ignored.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{Result, SimilarityError};

pub const DEFAULT_UPPER_THRESHOLD: f64 = 0.9999;
pub const MAX_HASH_SIZE: usize = 64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityConfig {
    pub threshold: f64,
    pub num_hashes: usize,
    pub hash_size: usize,
    #[serde(
        rename = "to ignore",
        default,
        deserialize_with = "ignore_path",
        skip_serializing_if = "Option::is_none"
    )]
    pub to_ignore: Option<String>,
    #[serde(default = "default_upper_threshold")]
    pub upper_threshold: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

fn default_upper_threshold() -> f64 {
    DEFAULT_UPPER_THRESHOLD
}

/// `"to ignore"` is either absent or a string; `null` is rejected with the
/// other non-string values.
fn ignore_path<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Option<String>, D::Error> {
    String::deserialize(deserializer).map(Some)
}

impl SimilarityConfig {
    pub fn new(threshold: f64, num_hashes: usize, hash_size: usize) -> Self {
        Self {
            threshold,
            num_hashes,
            hash_size,
            to_ignore: None,
            upper_threshold: DEFAULT_UPPER_THRESHOLD,
            seed: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_upper_threshold(mut self, upper_threshold: f64) -> Self {
        self.upper_threshold = upper_threshold;
        self
    }

    pub fn from_value(value: &Value) -> Result<Self> {
        let config: Self = serde_json::from_value(value.clone())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_hashes == 0 {
            return Err(SimilarityError::InvalidConfig(
                "num_hashes must be at least 1".to_string(),
            ));
        }
        if self.hash_size == 0 || self.hash_size > MAX_HASH_SIZE {
            return Err(SimilarityError::InvalidConfig(format!(
                "hash_size must be in 1..={MAX_HASH_SIZE}, got {}",
                self.hash_size
            )));
        }
        if !self.threshold.is_finite() || !self.upper_threshold.is_finite() {
            return Err(SimilarityError::InvalidConfig(
                "thresholds must be finite".to_string(),
            ));
        }
        if self.threshold >= self.upper_threshold {
            return Err(SimilarityError::InvalidConfig(format!(
                "threshold {} must be below upper_threshold {}",
                self.threshold, self.upper_threshold
            )));
        }
        Ok(())
    }

    /// Whether `similarity` falls strictly inside the acceptance band.
    pub fn accepts(&self, similarity: f64) -> bool {
        self.threshold < similarity && similarity < self.upper_threshold
    }
}
