use thiserror::Error;

use crate::catalog::{ActorId, ItemId, SubjectKind};

/// No record survived scoping and key resolution, so there is nothing to pivot.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("no completed interactions qualify for the interaction matrix ({qty_records} records read)")]
pub struct EmptyDatasetError {
    pub qty_records: usize,
}

/// A single record whose row or column key could not be resolved, e.g. the
/// purchased listing has since been deleted. Never fatal: the record is skipped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("record of actor {actor_id} for item {item_id} has no resolvable {field}")]
pub struct MissingFieldError {
    pub actor_id: ActorId,
    pub item_id: ItemId,
    pub field: &'static str,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{row_id} has no completed interactions in the fitted matrix")]
pub struct RowNotFoundError {
    pub row_id: u64,
}

/// Data sparsity, surfaced to callers as a soft "not enough data" result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InsufficientDataError {
    #[error("not enough data: {0}")]
    EmptyDataset(#[from] EmptyDatasetError),

    #[error("not enough data: {0}")]
    RowNotFound(#[from] RowNotFoundError),

    #[error("not enough data: actor {actor_id} has no completed purchases")]
    NoHistory { actor_id: ActorId },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecommendationError {
    #[error(transparent)]
    InsufficientData(#[from] InsufficientDataError),

    #[error("{kind} {id} not found")]
    NotFound { kind: SubjectKind, id: u64 },
}

impl RecommendationError {
    pub fn is_insufficient_data(&self) -> bool {
        matches!(self, RecommendationError::InsufficientData(_))
    }
}

impl From<EmptyDatasetError> for RecommendationError {
    fn from(error: EmptyDatasetError) -> Self {
        RecommendationError::InsufficientData(error.into())
    }
}

impl From<RowNotFoundError> for RecommendationError {
    fn from(error: RowNotFoundError) -> Self {
        RecommendationError::InsufficientData(error.into())
    }
}
