use tracing::debug;

use crate::catalog::InteractionRecord;
use crate::error::EmptyDatasetError;
use crate::knn::interaction_matrix::{build, BuildReport};
use crate::knn::similarity_index::SimilarityIndex;
use crate::knn::strategy::MatrixStrategy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Building,
    Ready,
    Failed,
}

/// Immutable handle produced by a successful build.
#[derive(Debug, Clone)]
pub struct FittedModel {
    index: SimilarityIndex,
    report: BuildReport,
}

impl FittedModel {
    pub fn index(&self) -> &SimilarityIndex {
        &self.index
    }

    pub fn report(&self) -> &BuildReport {
        &self.report
    }
}

/// One build of the interaction matrix for one request.
pub struct ModelSession<S> {
    strategy: S,
    state: SessionState,
}

impl<S: MatrixStrategy> ModelSession<S> {
    pub fn new(strategy: S) -> Self {
        ModelSession {
            strategy,
            state: SessionState::Uninitialized,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    /// Builds the matrix and fits the index from scratch. Calling this again
    /// rebuilds; no earlier model is reused.
    pub fn initialize(
        &mut self,
        records: &[InteractionRecord],
    ) -> Result<FittedModel, EmptyDatasetError> {
        self.transition(SessionState::Building);
        match build(records, &self.strategy) {
            Ok((matrix, report)) => {
                let index = SimilarityIndex::fit(matrix);
                self.transition(SessionState::Ready);
                Ok(FittedModel { index, report })
            }
            Err(error) => {
                self.transition(SessionState::Failed);
                Err(error)
            }
        }
    }

    fn transition(&mut self, next: SessionState) {
        debug!(from = ?self.state, to = ?next, "model session");
        self.state = next;
    }
}
