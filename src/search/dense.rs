//! Flat inner-product index over one meeting's embedding matrix.
//!
//! Exhaustive scan; meetings hold hundreds to low thousands of passages, so
//! there is nothing to gain from an approximate structure.

use std::cmp::Ordering;

use super::embedding::EmbeddingMatrix;
use super::error::{Error, Result};

/// One search hit: matrix row and its inner product with the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DenseHit {
    pub row: usize,
    pub score: f32,
}

pub struct DenseIndex {
    matrix: EmbeddingMatrix,
}

impl DenseIndex {
    /// Vectors are used as stored; no re-normalization.
    pub fn build(matrix: EmbeddingMatrix) -> Self {
        Self { matrix }
    }

    pub fn len(&self) -> usize {
        self.matrix.rows()
    }

    pub fn is_empty(&self) -> bool {
        self.matrix.is_empty()
    }

    /// Dimensionality discovered from the stored matrix.
    pub fn dim(&self) -> usize {
        self.matrix.dim()
    }

    /// Up to `k` rows by descending inner product, ties by row ascending.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<DenseHit>> {
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.dim() {
            return Err(Error::DimensionMismatch {
                expected: self.dim(),
                actual: query.len(),
            });
        }

        let mut hits: Vec<DenseHit> = self
            .matrix
            .iter_rows()
            .enumerate()
            .map(|(row, vector)| DenseHit {
                row,
                score: inner_product(query, vector),
            })
            .collect();

        hits.sort_by(|a, b| rank_order(a.score, a.row, b.score, b.row));
        hits.truncate(k);
        Ok(hits)
    }
}

pub fn inner_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Descending score, then ascending position. Total over floats so the
/// order is deterministic even with NaN present.
pub(crate) fn rank_order(score_a: f32, pos_a: usize, score_b: f32, pos_b: usize) -> Ordering {
    score_b.total_cmp(&score_a).then(pos_a.cmp(&pos_b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(rows: Vec<Vec<f32>>) -> DenseIndex {
        DenseIndex::build(EmbeddingMatrix::from_rows(rows).unwrap())
    }

    #[test]
    fn test_orders_by_inner_product() {
        let idx = index(vec![vec![0.1, 0.0], vec![0.9, 0.0], vec![0.5, 0.5]]);
        let hits = idx.search(&[1.0, 0.0], 3).unwrap();
        let rows: Vec<usize> = hits.iter().map(|h| h.row).collect();
        assert_eq!(rows, vec![1, 2, 0]);
        assert!((hits[0].score - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_no_renormalization() {
        // A long vector beats a well-aligned short one under inner product
        let idx = index(vec![vec![0.6, 0.8], vec![3.0, 0.0]]);
        let hits = idx.search(&[0.6, 0.8], 1).unwrap();
        assert_eq!(hits[0].row, 1);
    }

    #[test]
    fn test_fewer_rows_than_k() {
        let idx = index(vec![vec![1.0], vec![2.0]]);
        assert_eq!(idx.search(&[1.0], 10).unwrap().len(), 2);
        assert!(idx.search(&[1.0], 0).unwrap().is_empty());
    }

    #[test]
    fn test_ties_by_row() {
        let idx = index(vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 0.0]]);
        let hits = idx.search(&[1.0, 0.0], 3).unwrap();
        let rows: Vec<usize> = hits.iter().map(|h| h.row).collect();
        assert_eq!(rows, vec![0, 2, 1]);
    }

    #[test]
    fn test_dimension_mismatch() {
        let idx = index(vec![vec![1.0, 0.0, 0.0]]);
        let err = idx.search(&[1.0, 0.0], 1).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { expected: 3, actual: 2 }));
    }

    #[test]
    fn test_empty_index() {
        let idx = DenseIndex::build(EmbeddingMatrix::default());
        assert!(idx.is_empty());
        assert!(idx.search(&[1.0], 5).unwrap().is_empty());
    }
}
