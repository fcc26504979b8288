use std::fmt;

use hashbrown::HashSet;
use serde_derive::{Deserialize, Serialize};

pub mod memory_store;

pub type ActorId = u64;
pub type ItemId = u64;
pub type GroupingId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PurchaseStatus {
    Pending,
    Accepted,
    Rejected,
    Completed,
}

/// A purchase as the marketplace stores it, whatever its status.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Purchase {
    pub user_id: ActorId,
    pub listing_id: ItemId,
    pub quantity: u32,
    pub status: PurchaseStatus,
    /// Seconds since the epoch.
    #[serde(default)]
    pub purchased_at: Option<i64>,
}

/// Demand signal derived from a completed purchase. Which subject the record
/// counts towards (the item itself or its grouping) is decided by the matrix
/// strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InteractionRecord {
    pub actor_id: ActorId,
    pub item_id: ItemId,
    pub quantity: u32,
}

impl From<&Purchase> for InteractionRecord {
    fn from(purchase: &Purchase) -> Self {
        InteractionRecord {
            actor_id: purchase.user_id,
            item_id: purchase.listing_id,
            quantity: purchase.quantity,
        }
    }
}

/// A listing. Every item belongs to exactly one grouping.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Item {
    pub id: ItemId,
    #[serde(rename = "restaurant_id")]
    pub grouping_id: GroupingId,
    pub title: String,
    #[serde(default)]
    pub pick_up_price: Option<f64>,
    #[serde(default)]
    pub delivery_price: Option<f64>,
}

/// A restaurant: a container of items sharing a category label.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Grouping {
    pub id: GroupingId,
    #[serde(rename = "restaurant_name")]
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectKind {
    Item,
    Grouping,
    Actor,
}

impl fmt::Display for SubjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SubjectKind::Item => "item",
            SubjectKind::Grouping => "grouping",
            SubjectKind::Actor => "actor",
        };
        f.write_str(name)
    }
}

pub trait TransactionReader {
    /// Interactions derived from COMPLETED purchases only. When `scope` is
    /// given, only purchases of those items are returned.
    fn list_completed_interactions(&self, scope: Option<&HashSet<ItemId>>)
        -> Vec<InteractionRecord>;
}

pub trait CatalogReader {
    fn get_item(&self, item_id: ItemId) -> Option<Item>;

    fn get_grouping(&self, grouping_id: GroupingId) -> Option<Grouping>;

    fn items_in_grouping(&self, grouping_id: GroupingId) -> Vec<ItemId>;

    fn groupings_in_category(&self, category: &str) -> Vec<GroupingId>;
}

pub trait ActorHistoryReader {
    /// Items the actor has completed purchases for, without duplicates.
    fn get_actor_interactions(&self, actor_id: ActorId) -> Vec<ItemId>;
}

/// Everything the recommendation engine reads from.
pub trait MarketplaceStore: TransactionReader + CatalogReader + ActorHistoryReader {}

impl<T> MarketplaceStore for T where T: TransactionReader + CatalogReader + ActorHistoryReader + ?Sized {}
