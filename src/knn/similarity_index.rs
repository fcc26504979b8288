use crate::error::RowNotFoundError;
use crate::knn::interaction_matrix::InteractionMatrix;
use crate::knn::{top_k, NeighborScore, RowId};

/// Brute-force cosine neighbor search over the rows of a fitted matrix.
///
/// The index owns its matrix and is never mutated after `fit`, so repeated
/// queries against the same index return identical results.
#[derive(Debug, Clone)]
pub struct SimilarityIndex {
    matrix: InteractionMatrix,
    norms: Vec<f64>,
}

impl SimilarityIndex {
    pub fn fit(matrix: InteractionMatrix) -> Self {
        let norms = (0..matrix.qty_rows())
            .map(|position| {
                matrix
                    .row(position)
                    .iter()
                    .map(|value| value * value)
                    .sum::<f64>()
                    .sqrt()
            })
            .collect();

        SimilarityIndex { matrix, norms }
    }

    pub fn matrix(&self) -> &InteractionMatrix {
        &self.matrix
    }

    /// The `k` rows most similar to `row_id`, excluding `row_id` itself.
    ///
    /// `k` is clamped to the number of other rows; a single-row matrix yields
    /// an empty result.
    pub fn query(&self, row_id: RowId, k: usize) -> Result<Vec<NeighborScore>, RowNotFoundError> {
        let query_position = self
            .matrix
            .position_of(row_id)
            .ok_or(RowNotFoundError { row_id })?;

        let k = k.min(self.matrix.qty_rows().saturating_sub(1));
        if k == 0 {
            return Ok(Vec::new());
        }

        let candidates = self
            .matrix
            .row_ids()
            .iter()
            .enumerate()
            .filter(|(position, _)| *position != query_position)
            .map(|(position, candidate_id)| {
                NeighborScore::new(*candidate_id, self.similarity(query_position, position))
            });

        Ok(top_k(candidates, k))
    }

    /// 1 - cosine distance, clamped to [0, 1]. Rows without any interaction
    /// are similar to nothing.
    fn similarity(&self, left: usize, right: usize) -> f64 {
        let norm_product = self.norms[left] * self.norms[right];
        if norm_product <= f64::EPSILON {
            return 0.0;
        }

        let dot_product: f64 = self
            .matrix
            .row(left)
            .iter()
            .zip(self.matrix.row(right).iter())
            .map(|(a, b)| a * b)
            .sum();

        let distance = 1.0 - dot_product / norm_product;
        (1.0 - distance).clamp(0.0, 1.0)
    }
}
