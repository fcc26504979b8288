use hashbrown::{HashMap, HashSet};
use itertools::Itertools;

use crate::catalog::{
    ActorHistoryReader, ActorId, CatalogReader, Grouping, GroupingId, InteractionRecord, Item,
    ItemId, Purchase, PurchaseStatus, TransactionReader,
};
use crate::config::DataConfig;
use crate::io::{read_groupings, read_items, read_purchases};

/// Purchases, listings and restaurants held in memory.
pub struct MemoryStore {
    purchases: Vec<Purchase>,
    items: HashMap<ItemId, Item>,
    groupings: HashMap<GroupingId, Grouping>,
}

impl MemoryStore {
    pub fn new(purchases: Vec<Purchase>, items: Vec<Item>, groupings: Vec<Grouping>) -> Self {
        MemoryStore {
            purchases,
            items: items.into_iter().map(|item| (item.id, item)).collect(),
            groupings: groupings
                .into_iter()
                .map(|grouping| (grouping.id, grouping))
                .collect(),
        }
    }

    pub fn from_csv(data: &DataConfig) -> Result<Self, csv::Error> {
        let purchases = read_purchases(&data.purchases_path)?;
        let items = read_items(&data.listings_path)?;
        let groupings = read_groupings(&data.restaurants_path)?;
        Ok(MemoryStore::new(purchases, items, groupings))
    }

    pub fn purchases(&self) -> &[Purchase] {
        &self.purchases
    }

    fn completed_purchases(&self) -> impl Iterator<Item = &Purchase> {
        self.purchases
            .iter()
            .filter(|purchase| purchase.status == PurchaseStatus::Completed)
    }
}

impl TransactionReader for MemoryStore {
    fn list_completed_interactions(
        &self,
        scope: Option<&HashSet<ItemId>>,
    ) -> Vec<InteractionRecord> {
        self.completed_purchases()
            .filter(|purchase| scope.map_or(true, |items| items.contains(&purchase.listing_id)))
            .map(InteractionRecord::from)
            .collect()
    }
}

impl CatalogReader for MemoryStore {
    fn get_item(&self, item_id: ItemId) -> Option<Item> {
        self.items.get(&item_id).cloned()
    }

    fn get_grouping(&self, grouping_id: GroupingId) -> Option<Grouping> {
        self.groupings.get(&grouping_id).cloned()
    }

    fn items_in_grouping(&self, grouping_id: GroupingId) -> Vec<ItemId> {
        self.items
            .values()
            .filter(|item| item.grouping_id == grouping_id)
            .map(|item| item.id)
            .sorted_unstable()
            .collect()
    }

    fn groupings_in_category(&self, category: &str) -> Vec<GroupingId> {
        self.groupings
            .values()
            .filter(|grouping| grouping.category == category)
            .map(|grouping| grouping.id)
            .sorted_unstable()
            .collect()
    }
}

impl ActorHistoryReader for MemoryStore {
    fn get_actor_interactions(&self, actor_id: ActorId) -> Vec<ItemId> {
        self.completed_purchases()
            .filter(|purchase| purchase.user_id == actor_id)
            .map(|purchase| purchase.listing_id)
            .sorted_unstable()
            .dedup()
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::catalog::{Grouping, Item, Purchase, PurchaseStatus};

    pub fn completed(user_id: u64, listing_id: u64, quantity: u32) -> Purchase {
        with_status(user_id, listing_id, quantity, PurchaseStatus::Completed)
    }

    pub fn with_status(
        user_id: u64,
        listing_id: u64,
        quantity: u32,
        status: PurchaseStatus,
    ) -> Purchase {
        Purchase {
            user_id,
            listing_id,
            quantity,
            status,
            purchased_at: None,
        }
    }

    pub fn item(id: u64, grouping_id: u64) -> Item {
        Item {
            id,
            grouping_id,
            title: format!("Listing {}", id),
            pick_up_price: Some(4.5),
            delivery_price: Some(6.0),
        }
    }

    pub fn grouping(id: u64, category: &str) -> Grouping {
        Grouping {
            id,
            name: format!("Restaurant {}", id),
            category: category.to_string(),
            latitude: Some(41.0),
            longitude: Some(29.0),
        }
    }
}

#[cfg(test)]
mod memory_store_test {
    use super::fixtures::*;
    use super::*;

    fn store() -> MemoryStore {
        MemoryStore::new(
            vec![
                completed(1, 10, 2),
                completed(1, 10, 1),
                completed(2, 20, 1),
                with_status(3, 10, 4, PurchaseStatus::Pending),
                with_status(3, 20, 4, PurchaseStatus::Accepted),
                with_status(1, 30, 4, PurchaseStatus::Rejected),
            ],
            vec![item(10, 1), item(11, 1), item(20, 2), item(30, 3)],
            vec![grouping(1, "pizza"), grouping(2, "pizza"), grouping(3, "sushi")],
        )
    }

    #[test]
    fn should_only_list_completed_purchases() {
        let records = store().list_completed_interactions(None);
        assert_eq!(3, records.len());
        assert!(records.iter().all(|record| record.actor_id != 3));
    }

    #[test]
    fn should_restrict_to_scope() {
        let scope: HashSet<ItemId> = vec![20].into_iter().collect();
        let records = store().list_completed_interactions(Some(&scope));
        assert_eq!(
            vec![InteractionRecord {
                actor_id: 2,
                item_id: 20,
                quantity: 1
            }],
            records
        );
    }

    #[test]
    fn should_resolve_catalog_lookups() {
        let store = store();
        assert_eq!(vec![10, 11], store.items_in_grouping(1));
        assert_eq!(vec![1, 2], store.groupings_in_category("pizza"));
        assert_eq!(Some(3), store.get_item(30).map(|item| item.grouping_id));
        assert!(store.get_grouping(9).is_none());
    }

    #[test]
    fn should_deduplicate_actor_history() {
        let store = store();
        assert_eq!(vec![10], store.get_actor_interactions(1));
        assert!(store.get_actor_interactions(3).is_empty());
    }
}
