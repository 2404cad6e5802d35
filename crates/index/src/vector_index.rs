//! Flat inner-product index over unit vectors.
//!
//! Vectors are stored back to back in one buffer, in insertion order.
//! A search scores every vector, so cost is linear in the entry count;
//! the corpus is rebuilt from scratch every cycle and stays small.

use crate::error::IndexError;

/// One scored candidate. `position` indexes the paired summary list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub score: f32,
    pub position: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    dimensions: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    /// An index with no entries.
    pub fn empty(dimensions: usize) -> Self {
        Self {
            dimensions,
            data: Vec::new(),
        }
    }

    /// Build a fresh index from a complete batch.
    pub fn build(dimensions: usize, vectors: &[Vec<f32>]) -> Result<Self, IndexError> {
        let mut data = Vec::with_capacity(dimensions * vectors.len());
        for (position, vector) in vectors.iter().enumerate() {
            if vector.len() != dimensions {
                return Err(IndexError::DimensionMismatch {
                    position,
                    expected: dimensions,
                    actual: vector.len(),
                });
            }
            data.extend_from_slice(vector);
        }

        Ok(Self { dimensions, data })
    }

    /// Rebuild from the flat buffer written by [`FlatIndex::as_raw`].
    pub fn from_raw(dimensions: usize, data: Vec<f32>) -> Result<Self, IndexError> {
        if (dimensions == 0 && !data.is_empty()) || (dimensions > 0 && data.len() % dimensions != 0) {
            return Err(IndexError::DimensionMismatch {
                position: data.len() / dimensions.max(1),
                expected: dimensions,
                actual: data.len() % dimensions.max(1),
            });
        }
        Ok(Self { dimensions, data })
    }

    pub fn as_raw(&self) -> &[f32] {
        &self.data
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn len(&self) -> usize {
        if self.dimensions == 0 {
            0
        } else {
            self.data.len() / self.dimensions
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn vector(&self, position: usize) -> Option<&[f32]> {
        let start = position.checked_mul(self.dimensions)?;
        self.data.get(start..start + self.dimensions)
    }

    /// Top `min(k, len)` entries by inner product, highest first.
    ///
    /// Equal scores keep insertion order. Scores are clamped to [-1, 1]
    /// so float error on unit vectors never leaves that range.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Hit>, IndexError> {
        if query.len() != self.dimensions {
            return Err(IndexError::DimensionMismatch {
                position: 0,
                expected: self.dimensions,
                actual: query.len(),
            });
        }

        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }

        let mut hits: Vec<Hit> = self
            .data
            .chunks_exact(self.dimensions)
            .enumerate()
            .map(|(position, vector)| Hit {
                score: dot(query, vector).clamp(-1.0, 1.0),
                position,
            })
            .collect();

        // sort_by is stable, so ties stay in insertion order.
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(k);
        Ok(hits)
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
