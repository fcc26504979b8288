use hashbrown::HashMap;
use itertools::Itertools;
use tracing::{debug, warn};

use crate::catalog::InteractionRecord;
use crate::error::{EmptyDatasetError, MissingFieldError};
use crate::knn::strategy::{CellValue, MatrixStrategy};
use crate::knn::{ColId, RowId};

/// Dense subject x actor matrix. Rows and columns are ordered by ascending id
/// and the row-id list always has one entry per matrix row.
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionMatrix {
    row_ids: Vec<RowId>,
    col_ids: Vec<ColId>,
    values: Vec<f64>,
    row_positions: HashMap<RowId, usize>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BuildReport {
    pub qty_records: usize,
    pub qty_out_of_scope: usize,
    pub qty_missing_fields: usize,
    pub qty_cells: usize,
}

impl InteractionMatrix {
    pub fn row_ids(&self) -> &[RowId] {
        &self.row_ids
    }

    pub fn col_ids(&self) -> &[ColId] {
        &self.col_ids
    }

    pub fn qty_rows(&self) -> usize {
        self.row_ids.len()
    }

    pub fn qty_cols(&self) -> usize {
        self.col_ids.len()
    }

    pub fn position_of(&self, row_id: RowId) -> Option<usize> {
        self.row_positions.get(&row_id).copied()
    }

    pub fn row(&self, position: usize) -> &[f64] {
        let start = position * self.col_ids.len();
        &self.values[start..start + self.col_ids.len()]
    }

    pub fn row_by_id(&self, row_id: RowId) -> Option<&[f64]> {
        self.position_of(row_id).map(|position| self.row(position))
    }

    /// Columns with a non-zero cell in the given row.
    pub fn interacted_cols(&self, row_id: RowId) -> Vec<ColId> {
        self.row_by_id(row_id)
            .map(|row| {
                row.iter()
                    .zip(self.col_ids.iter())
                    .filter(|(value, _)| **value > 0.0)
                    .map(|(_, col_id)| *col_id)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn get(&self, row_id: RowId, col_id: ColId) -> Option<f64> {
        let row = self.row_by_id(row_id)?;
        let col = self.col_ids.binary_search(&col_id).ok()?;
        Some(row[col])
    }
}

/// Pivots interaction records into a fresh matrix.
///
/// Duplicate (row, col) pairs are summed, absent pairs are 0.0. Records that
/// fall outside the strategy's scope or whose keys cannot be resolved are
/// skipped and counted in the returned report.
pub fn build<S>(
    records: &[InteractionRecord],
    strategy: &S,
) -> Result<(InteractionMatrix, BuildReport), EmptyDatasetError>
where
    S: MatrixStrategy + ?Sized,
{
    let mut report = BuildReport {
        qty_records: records.len(),
        ..BuildReport::default()
    };

    let mut cells: HashMap<(RowId, ColId), f64> = HashMap::with_capacity(records.len());
    for record in records {
        if !strategy.in_scope(record) {
            report.qty_out_of_scope += 1;
            continue;
        }
        match resolve_keys(strategy, record) {
            Ok(key) => *cells.entry(key).or_insert(0.0) += strategy.value(record),
            Err(missing) => {
                debug!(%missing, "excluding interaction record");
                report.qty_missing_fields += 1;
            }
        }
    }

    if report.qty_missing_fields > 0 {
        warn!(
            qty_missing_fields = report.qty_missing_fields,
            qty_records = report.qty_records,
            "excluded interaction records without resolvable keys"
        );
    }

    if cells.is_empty() {
        return Err(EmptyDatasetError {
            qty_records: records.len(),
        });
    }

    let row_ids: Vec<RowId> = cells
        .keys()
        .map(|(row_id, _)| *row_id)
        .sorted_unstable()
        .dedup()
        .collect();
    let col_ids: Vec<ColId> = cells
        .keys()
        .map(|(_, col_id)| *col_id)
        .sorted_unstable()
        .dedup()
        .collect();

    let row_positions: HashMap<RowId, usize> = row_ids
        .iter()
        .enumerate()
        .map(|(position, row_id)| (*row_id, position))
        .collect();
    let col_positions: HashMap<ColId, usize> = col_ids
        .iter()
        .enumerate()
        .map(|(position, col_id)| (*col_id, position))
        .collect();

    let qty_cols = col_ids.len();
    let mut values = vec![0.0_f64; row_ids.len() * qty_cols];
    let cell_value = strategy.cell_value();
    for ((row_id, col_id), aggregated) in cells.iter() {
        let offset = row_positions[row_id] * qty_cols + col_positions[col_id];
        values[offset] = match cell_value {
            CellValue::Quantity => *aggregated,
            CellValue::Presence => 1.0,
        };
    }
    report.qty_cells = cells.len();

    debug!(
        qty_rows = row_ids.len(),
        qty_cols,
        qty_cells = report.qty_cells,
        "built interaction matrix"
    );

    Ok((
        InteractionMatrix {
            row_ids,
            col_ids,
            values,
            row_positions,
        },
        report,
    ))
}

fn resolve_keys<S>(
    strategy: &S,
    record: &InteractionRecord,
) -> Result<(RowId, ColId), MissingFieldError>
where
    S: MatrixStrategy + ?Sized,
{
    Ok((strategy.row_key(record)?, strategy.col_key(record)?))
}

#[cfg(test)]
mod interaction_matrix_test {
    use super::*;
    use crate::knn::strategy::SubjectsByActor;

    const USER_A: u64 = 1000;
    const USER_B: u64 = 1001;

    fn record(actor_id: u64, item_id: u64, quantity: u32) -> InteractionRecord {
        InteractionRecord {
            actor_id,
            item_id,
            quantity,
        }
    }

    fn scenario_a() -> Vec<InteractionRecord> {
        vec![record(USER_A, 1, 2), record(USER_A, 2, 1), record(USER_B, 1, 1)]
    }

    /// Rows only for even items; odd items count as deleted listings.
    struct EvenItemsOnly;

    impl MatrixStrategy for EvenItemsOnly {
        fn row_key(&self, record: &InteractionRecord) -> Result<RowId, MissingFieldError> {
            if record.item_id % 2 == 0 {
                Ok(record.item_id)
            } else {
                Err(MissingFieldError {
                    actor_id: record.actor_id,
                    item_id: record.item_id,
                    field: "item",
                })
            }
        }

        fn col_key(&self, record: &InteractionRecord) -> Result<ColId, MissingFieldError> {
            Ok(record.actor_id)
        }

        fn in_scope(&self, record: &InteractionRecord) -> bool {
            record.item_id < 100
        }
    }

    #[test]
    fn should_pivot_scenario_a() {
        let (matrix, report) = build(&scenario_a(), &SubjectsByActor::default()).unwrap();

        assert_eq!(&[1, 2], matrix.row_ids());
        assert_eq!(&[USER_A, USER_B], matrix.col_ids());
        assert_eq!(&[2.0, 1.0], matrix.row(0));
        assert_eq!(&[1.0, 0.0], matrix.row(1));
        assert_eq!(Some(0.0), matrix.get(2, USER_B));
        assert_eq!(3, report.qty_records);
        assert_eq!(3, report.qty_cells);
    }

    #[test]
    fn should_sum_duplicate_pairs() {
        let records = vec![record(USER_A, 1, 2), record(USER_A, 1, 3), record(USER_B, 1, 1)];
        let (matrix, _) = build(&records, &SubjectsByActor::default()).unwrap();

        assert_eq!(1, matrix.qty_rows());
        assert_eq!(Some(5.0), matrix.get(1, USER_A));
    }

    #[test]
    fn should_count_distinct_rows_and_cols() {
        let records = vec![
            record(7, 3, 1),
            record(8, 3, 1),
            record(7, 5, 2),
            record(9, 4, 1),
            record(9, 4, 1),
        ];
        let (matrix, _) = build(&records, &SubjectsByActor::default()).unwrap();

        assert_eq!(3, matrix.qty_rows());
        assert_eq!(3, matrix.qty_cols());
        assert_eq!(matrix.qty_rows(), matrix.row_ids().len());
    }

    #[test]
    fn should_not_depend_on_record_order() {
        let records = vec![
            record(USER_A, 1, 2),
            record(USER_B, 3, 1),
            record(USER_A, 2, 1),
            record(USER_B, 1, 1),
            record(USER_A, 1, 4),
        ];
        let mut shuffled = records.clone();
        shuffled.reverse();
        shuffled.swap(0, 2);

        let (matrix, _) = build(&records, &SubjectsByActor::default()).unwrap();
        let (matrix_shuffled, _) = build(&shuffled, &SubjectsByActor::default()).unwrap();

        assert_eq!(matrix, matrix_shuffled);
    }

    #[test]
    fn should_mark_presence() {
        let strategy = SubjectsByActor {
            cell_value: CellValue::Presence,
        };
        let (matrix, _) = build(&scenario_a(), &strategy).unwrap();

        assert_eq!(&[1.0, 1.0], matrix.row(0));
        assert_eq!(&[1.0, 0.0], matrix.row(1));
    }

    #[test]
    fn should_skip_and_count_unresolvable_records() {
        let records = vec![
            record(USER_A, 2, 1),
            record(USER_A, 3, 1),
            record(USER_B, 4, 1),
            record(USER_B, 200, 1),
        ];
        let (matrix, report) = build(&records, &EvenItemsOnly).unwrap();

        assert_eq!(&[2, 4], matrix.row_ids());
        assert_eq!(1, report.qty_missing_fields);
        assert_eq!(1, report.qty_out_of_scope);
        assert_eq!(vec![USER_B], matrix.interacted_cols(4));
    }

    #[test]
    fn should_fail_on_empty_dataset() {
        let result = build(&[], &SubjectsByActor::default());
        assert_eq!(Err(EmptyDatasetError { qty_records: 0 }), result);
    }

    #[test]
    fn should_fail_when_no_record_resolves() {
        let records = vec![record(USER_A, 3, 1), record(USER_B, 5, 2)];
        let result = build(&records, &EvenItemsOnly);
        assert_eq!(Err(EmptyDatasetError { qty_records: 2 }), result);
    }
}
