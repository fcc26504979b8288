use hashbrown::HashMap;
use serde_derive::Serialize;
use tracing::debug;

use crate::catalog::{CatalogReader, Grouping, GroupingId, Item, ItemId};
use crate::knn::NeighborScore;

const UNKNOWN_GROUPING_NAME: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemSummary {
    pub id: ItemId,
    pub title: String,
}

impl From<&Item> for ItemSummary {
    fn from(item: &Item) -> Self {
        ItemSummary {
            id: item.id,
            title: item.title.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub id: GroupingId,
    pub name: String,
    pub category: String,
}

impl From<&Grouping> for GroupSummary {
    fn from(grouping: &Grouping) -> Self {
        GroupSummary {
            id: grouping.id,
            name: grouping.name.clone(),
            category: grouping.category.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemRecommendation {
    pub item_id: ItemId,
    pub title: String,
    pub grouping_name: String,
    pub similarity_score: f64,
    /// Completed purchase rows of this item in the data the model was fitted on.
    pub qty_purchases: usize,
    pub pick_up_price: Option<f64>,
    pub delivery_price: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupRecommendation {
    pub grouping_id: GroupingId,
    pub name: String,
    pub category: String,
    pub similarity_score: f64,
    /// "latitude, longitude" when both are known.
    pub address: Option<String>,
    pub based_on: Option<GroupSummary>,
}

/// A ranked grouping together with the grouping that produced its score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedGrouping {
    pub score: NeighborScore,
    pub based_on: Option<GroupingId>,
}

/// Joins ranked ids back to display records. Ids that no longer resolve in
/// the catalog are dropped; order is preserved.
pub struct ResultAssembler<'c, C: ?Sized> {
    catalog: &'c C,
    purchase_counts: HashMap<ItemId, usize>,
}

impl<'c, C: CatalogReader + ?Sized> ResultAssembler<'c, C> {
    pub fn new(catalog: &'c C) -> Self {
        ResultAssembler {
            catalog,
            purchase_counts: HashMap::new(),
        }
    }

    /// Items without an entry are reported with zero purchases.
    pub fn with_purchase_counts(mut self, purchase_counts: HashMap<ItemId, usize>) -> Self {
        self.purchase_counts = purchase_counts;
        self
    }

    pub fn items(&self, ranked: &[NeighborScore]) -> Vec<ItemRecommendation> {
        ranked
            .iter()
            .filter_map(|scored| self.item(scored))
            .collect()
    }

    pub fn groupings(&self, ranked: &[RankedGrouping]) -> Vec<GroupRecommendation> {
        ranked
            .iter()
            .filter_map(|ranked| self.grouping(ranked))
            .collect()
    }

    fn item(&self, scored: &NeighborScore) -> Option<ItemRecommendation> {
        let item = match self.catalog.get_item(scored.id) {
            Some(item) => item,
            None => {
                debug!(item_id = scored.id, "dropping recommendation for missing item");
                return None;
            }
        };
        let grouping_name = self
            .catalog
            .get_grouping(item.grouping_id)
            .map(|grouping| grouping.name)
            .unwrap_or_else(|| UNKNOWN_GROUPING_NAME.to_string());

        Some(ItemRecommendation {
            item_id: item.id,
            title: item.title,
            grouping_name,
            similarity_score: scored.score,
            qty_purchases: self.purchase_counts.get(&item.id).copied().unwrap_or(0),
            pick_up_price: item.pick_up_price,
            delivery_price: item.delivery_price,
        })
    }

    fn grouping(&self, ranked: &RankedGrouping) -> Option<GroupRecommendation> {
        let grouping = match self.catalog.get_grouping(ranked.score.id) {
            Some(grouping) => grouping,
            None => {
                debug!(
                    grouping_id = ranked.score.id,
                    "dropping recommendation for missing grouping"
                );
                return None;
            }
        };
        let based_on = ranked
            .based_on
            .and_then(|grouping_id| self.catalog.get_grouping(grouping_id))
            .map(|base| GroupSummary::from(&base));
        let address = match (grouping.latitude, grouping.longitude) {
            (Some(latitude), Some(longitude)) => Some(format!("{}, {}", latitude, longitude)),
            _ => None,
        };

        Some(GroupRecommendation {
            grouping_id: grouping.id,
            name: grouping.name,
            category: grouping.category,
            similarity_score: ranked.score.score,
            address,
            based_on,
        })
    }
}
