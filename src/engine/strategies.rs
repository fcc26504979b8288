use hashbrown::HashSet;

use crate::catalog::{CatalogReader, InteractionRecord, ItemId};
use crate::error::MissingFieldError;
use crate::knn::strategy::{CellValue, MatrixStrategy};
use crate::knn::{ColId, RowId};

fn missing(record: &InteractionRecord, field: &'static str) -> MissingFieldError {
    MissingFieldError {
        actor_id: record.actor_id,
        item_id: record.item_id,
        field,
    }
}

fn live_item<C>(catalog: &C, record: &InteractionRecord) -> Result<ItemId, MissingFieldError>
where
    C: CatalogReader + ?Sized,
{
    catalog
        .get_item(record.item_id)
        .map(|item| item.id)
        .ok_or_else(|| missing(record, "item"))
}

/// Item rows against actor columns, optionally restricted to a set of items.
pub struct ItemsByActor<'c, C: ?Sized> {
    catalog: &'c C,
    scope: Option<HashSet<ItemId>>,
}

impl<'c, C: CatalogReader + ?Sized> ItemsByActor<'c, C> {
    pub fn new(catalog: &'c C) -> Self {
        ItemsByActor {
            catalog,
            scope: None,
        }
    }

    pub fn scoped(catalog: &'c C, scope: HashSet<ItemId>) -> Self {
        ItemsByActor {
            catalog,
            scope: Some(scope),
        }
    }
}

impl<'c, C: CatalogReader + ?Sized> MatrixStrategy for ItemsByActor<'c, C> {
    fn row_key(&self, record: &InteractionRecord) -> Result<RowId, MissingFieldError> {
        live_item(self.catalog, record)
    }

    fn col_key(&self, record: &InteractionRecord) -> Result<ColId, MissingFieldError> {
        Ok(record.actor_id)
    }

    fn in_scope(&self, record: &InteractionRecord) -> bool {
        self.scope
            .as_ref()
            .map_or(true, |items| items.contains(&record.item_id))
    }
}

/// Grouping rows against actor columns: purchases count towards the
/// restaurant of the purchased listing.
pub struct GroupingsByActor<'c, C: ?Sized> {
    catalog: &'c C,
    cell_value: CellValue,
}

impl<'c, C: CatalogReader + ?Sized> GroupingsByActor<'c, C> {
    pub fn new(catalog: &'c C, cell_value: CellValue) -> Self {
        GroupingsByActor {
            catalog,
            cell_value,
        }
    }
}

impl<'c, C: CatalogReader + ?Sized> MatrixStrategy for GroupingsByActor<'c, C> {
    fn row_key(&self, record: &InteractionRecord) -> Result<RowId, MissingFieldError> {
        self.catalog
            .get_item(record.item_id)
            .map(|item| item.grouping_id)
            .ok_or_else(|| missing(record, "grouping"))
    }

    fn col_key(&self, record: &InteractionRecord) -> Result<ColId, MissingFieldError> {
        Ok(record.actor_id)
    }

    fn cell_value(&self) -> CellValue {
        self.cell_value
    }
}

/// Actor rows against item columns, for actor-to-actor neighborhoods. A cell
/// counts completed purchase rows; quantities are ignored.
pub struct ActorsByItem<'c, C: ?Sized> {
    catalog: &'c C,
}

impl<'c, C: CatalogReader + ?Sized> ActorsByItem<'c, C> {
    pub fn new(catalog: &'c C) -> Self {
        ActorsByItem { catalog }
    }
}

impl<'c, C: CatalogReader + ?Sized> MatrixStrategy for ActorsByItem<'c, C> {
    fn row_key(&self, record: &InteractionRecord) -> Result<RowId, MissingFieldError> {
        Ok(record.actor_id)
    }

    fn col_key(&self, record: &InteractionRecord) -> Result<ColId, MissingFieldError> {
        live_item(self.catalog, record)
    }

    fn value(&self, _record: &InteractionRecord) -> f64 {
        1.0
    }
}
