// SparseVector: a topic (or theme) keyed weight map.
//
// Event evidence, theme fingerprints and learned theme scores are all sparse
// maps from an identifier to a weight. Keys are kept in a BTreeMap so
// iteration order (and therefore every query we build from a vector) is
// stable across runs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from vector arithmetic.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VectorError {
    /// Normalizing a vector whose weights sum to zero (or that has no entries).
    #[error("cannot normalize a vector with {entries} entries summing to {total}")]
    DivisionByZero { entries: usize, total: f64 },

    /// Normalizing a vector holding a NaN or infinite weight.
    #[error("cannot normalize a vector with {entries} entries summing to non-finite {total}")]
    NonFinite { entries: usize, total: f64 },
}

/// Sparse mapping from identifier to weight.
///
/// Weights are expected to be non-negative but this is never checked:
/// negative weights are accumulated and multiplied like any other value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    weights: BTreeMap<String, f64>,
}

impl SparseVector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulate `weight` into the entry for `key`, creating it at 0.0 first.
    pub fn add(&mut self, key: impl Into<String>, weight: f64) {
        *self.weights.entry(key.into()).or_insert(0.0) += weight;
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.weights.get(key).copied()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.weights.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Iterate entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.weights.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.weights.keys().map(String::as_str)
    }

    /// Total of all weights.
    pub fn sum(&self) -> f64 {
        self.weights.values().sum()
    }

    /// Divide every weight by the total so the result sums to 1.0.
    ///
    /// Fails with `DivisionByZero` for an empty vector or one whose weights
    /// sum to exactly zero, and with `NonFinite` when the total is NaN or
    /// infinite. Either way no NaN weight is ever produced.
    pub fn normalize(&self) -> Result<SparseVector, VectorError> {
        let total = self.sum();
        if !total.is_finite() {
            return Err(VectorError::NonFinite {
                entries: self.len(),
                total,
            });
        }
        if self.is_empty() || total == 0.0 {
            return Err(VectorError::DivisionByZero {
                entries: self.len(),
                total,
            });
        }

        let weights = self
            .weights
            .iter()
            .map(|(k, v)| (k.clone(), v / total))
            .collect();
        Ok(Self { weights })
    }

    /// Keys present in both vectors, each mapped to the product of the two weights.
    ///
    /// Keys present on only one side are dropped.
    pub fn intersect_multiply(&self, other: &SparseVector) -> SparseVector {
        // Walk the smaller map and probe the larger one
        let (small, large) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };

        let weights = small
            .weights
            .iter()
            .filter_map(|(k, a)| large.weights.get(k).map(|b| (k.clone(), a * b)))
            .collect();
        Self { weights }
    }

    /// Sparse dot product: `intersect_multiply(other).sum()`.
    pub fn dot(&self, other: &SparseVector) -> f64 {
        self.intersect_multiply(other).sum()
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for SparseVector {
    /// Collects with `add` semantics: repeated keys accumulate.
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        let mut vector = SparseVector::new();
        vector.extend(iter);
        vector
    }
}

impl<K: Into<String>> Extend<(K, f64)> for SparseVector {
    fn extend<I: IntoIterator<Item = (K, f64)>>(&mut self, iter: I) {
        for (key, weight) in iter {
            self.add(key, weight);
        }
    }
}
