use chrono::{DateTime, Utc};
use rayon::prelude::*;
use tracing::info;

use crate::catalog::{Purchase, PurchaseStatus};

pub struct InteractionStats {
    pub descriptive_name: String,
    pub qty_records: usize,
    pub qty_completed: usize,
    pub qty_unique_actor_ids: usize,
    pub qty_unique_item_ids: usize,
    pub min_purchased_at: Option<DateTime<Utc>>,
    pub max_purchased_at: Option<DateTime<Utc>>,
}

pub fn determine_interaction_statistics(
    descriptive_name: &str,
    purchases: &[Purchase],
) -> InteractionStats {
    let completed: Vec<&Purchase> = purchases
        .par_iter()
        .filter(|purchase| purchase.status == PurchaseStatus::Completed)
        .collect();

    let mut actor_ids: Vec<u64> = completed.par_iter().map(|purchase| purchase.user_id).collect();
    actor_ids.par_sort_unstable();
    actor_ids.dedup();

    let mut item_ids: Vec<u64> = completed
        .par_iter()
        .map(|purchase| purchase.listing_id)
        .collect();
    item_ids.par_sort_unstable();
    item_ids.dedup();

    let timestamps = || completed.par_iter().filter_map(|purchase| purchase.purchased_at);
    let min_purchased_at = timestamps()
        .min()
        .and_then(|secs| DateTime::from_timestamp(secs, 0));
    let max_purchased_at = timestamps()
        .max()
        .and_then(|secs| DateTime::from_timestamp(secs, 0));

    InteractionStats {
        descriptive_name: descriptive_name.to_string(),
        qty_records: purchases.len(),
        qty_completed: completed.len(),
        qty_unique_actor_ids: actor_ids.len(),
        qty_unique_item_ids: item_ids.len(),
        min_purchased_at,
        max_purchased_at,
    }
}

impl InteractionStats {
    pub fn log(&self) {
        info!(
            qty_records = self.qty_records,
            qty_completed = self.qty_completed,
            qty_actors = self.qty_unique_actor_ids,
            qty_items = self.qty_unique_item_ids,
            "loaded {}",
            self.descriptive_name
        );
        if let (Some(min), Some(max)) = (self.min_purchased_at, self.max_purchased_at) {
            info!("{} span: {} / {}", self.descriptive_name, min, max);
        }
    }
}

#[cfg(test)]
mod stats_test {
    use super::*;
    use crate::catalog::memory_store::fixtures::{completed, with_status};

    #[test]
    fn should_count_completed_purchases_only() {
        let mut first = completed(1, 10, 1);
        first.purchased_at = Some(1_600_000_000);
        let mut last = completed(2, 11, 3);
        last.purchased_at = Some(1_700_000_000);
        let purchases = vec![
            first,
            last,
            completed(2, 10, 1),
            with_status(3, 12, 1, PurchaseStatus::Pending),
        ];

        let stats = determine_interaction_statistics("purchases", &purchases);

        assert_eq!(4, stats.qty_records);
        assert_eq!(3, stats.qty_completed);
        assert_eq!(2, stats.qty_unique_actor_ids);
        assert_eq!(2, stats.qty_unique_item_ids);
        assert_eq!(Some(1_600_000_000), stats.min_purchased_at.map(|at| at.timestamp()));
        assert_eq!(Some(1_700_000_000), stats.max_purchased_at.map(|at| at.timestamp()));
    }

    #[test]
    fn should_handle_missing_timestamps() {
        let stats = determine_interaction_statistics("purchases", &[completed(1, 10, 1)]);

        assert_eq!(1, stats.qty_completed);
        assert!(stats.min_purchased_at.is_none());
    }
}
