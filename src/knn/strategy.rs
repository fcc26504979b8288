use std::str::FromStr;

use crate::catalog::InteractionRecord;
use crate::error::MissingFieldError;
use crate::knn::{ColId, RowId};

/// How aggregated interactions become matrix cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellValue {
    /// Summed purchase quantity.
    Quantity,
    /// 1.0 when the pair interacted at all.
    Presence,
}

impl FromStr for CellValue {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "quantity" => Ok(CellValue::Quantity),
            "presence" => Ok(CellValue::Presence),
            other => Err(format!("unknown cell value '{}', expected quantity or presence", other)),
        }
    }
}

/// Decides how interaction records are pivoted: which row and column a
/// record lands in, what it contributes, and whether it takes part at all.
pub trait MatrixStrategy {
    fn row_key(&self, record: &InteractionRecord) -> Result<RowId, MissingFieldError>;

    fn col_key(&self, record: &InteractionRecord) -> Result<ColId, MissingFieldError>;

    fn value(&self, record: &InteractionRecord) -> f64 {
        record.quantity as f64
    }

    fn cell_value(&self) -> CellValue {
        CellValue::Quantity
    }

    fn in_scope(&self, _record: &InteractionRecord) -> bool {
        true
    }
}

/// Plain pivot of item rows against actor columns, no catalog involved.
#[derive(Debug, Clone, Copy)]
pub struct SubjectsByActor {
    pub cell_value: CellValue,
}

impl Default for SubjectsByActor {
    fn default() -> Self {
        SubjectsByActor {
            cell_value: CellValue::Quantity,
        }
    }
}

impl MatrixStrategy for SubjectsByActor {
    fn row_key(&self, record: &InteractionRecord) -> Result<RowId, MissingFieldError> {
        Ok(record.item_id)
    }

    fn col_key(&self, record: &InteractionRecord) -> Result<ColId, MissingFieldError> {
        Ok(record.actor_id)
    }

    fn cell_value(&self) -> CellValue {
        self.cell_value
    }
}
