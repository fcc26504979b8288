use std::cmp::Ordering;

use dary_heap::OctonaryHeap;
use serde_derive::Serialize;

pub mod interaction_matrix;
pub mod similarity_index;
pub mod strategy;

pub type RowId = u64;
pub type ColId = u64;

/// A neighbor row together with its similarity to the query row.
#[derive(PartialEq, Debug, Clone, Copy, Serialize)]
pub struct NeighborScore {
    pub id: RowId,
    pub score: f64,
}

impl NeighborScore {
    pub fn new(id: RowId, score: f64) -> Self {
        NeighborScore { id, score }
    }
}

impl Eq for NeighborScore {}

impl Ord for NeighborScore {
    // Best ranked first: descending score, ascending id on ties.
    fn cmp(&self, other: &Self) -> Ordering {
        match other.score.partial_cmp(&self.score) {
            Some(Ordering::Less) => Ordering::Less,
            Some(Ordering::Greater) => Ordering::Greater,
            _ => self.id.cmp(&other.id),
        }
    }
}

impl PartialOrd for NeighborScore {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Keeps the `how_many` best ranked candidates, best first.
pub fn top_k<I>(candidates: I, how_many: usize) -> Vec<NeighborScore>
where
    I: IntoIterator<Item = NeighborScore>,
{
    if how_many == 0 {
        return Vec::new();
    }

    // The heap root is the worst ranked candidate kept so far.
    let mut top: OctonaryHeap<NeighborScore> = OctonaryHeap::with_capacity(how_many);
    for candidate in candidates {
        if top.len() < how_many {
            top.push(candidate);
        } else if let Some(mut bottom) = top.peek_mut() {
            if candidate < *bottom {
                *bottom = candidate;
            }
        }
    }

    top.into_sorted_vec()
}

#[cfg(test)]
mod knn_test {
    use super::*;

    #[test]
    fn handle_ordering_neighborscore() {
        let largest = NeighborScore::new(123, 0.9);
        let middle = NeighborScore::new(234, 0.5);
        let smallest = NeighborScore::new(543, 0.1);

        let mut ranked = vec![smallest, largest, middle];
        ranked.sort();

        let ids: Vec<RowId> = ranked.iter().map(|scored| scored.id).collect();
        assert_eq!(vec![123, 234, 543], ids);
    }

    #[test]
    fn handle_ties_by_ascending_id() {
        let mut ranked = vec![
            NeighborScore::new(9, 0.5),
            NeighborScore::new(3, 0.5),
            NeighborScore::new(7, 0.8),
        ];
        ranked.sort();

        let ids: Vec<RowId> = ranked.iter().map(|scored| scored.id).collect();
        assert_eq!(vec![7, 3, 9], ids);
    }

    #[test]
    fn should_keep_best_candidates() {
        let candidates = vec![
            NeighborScore::new(1, 0.2),
            NeighborScore::new(2, 0.9),
            NeighborScore::new(3, 0.4),
            NeighborScore::new(4, 0.9),
            NeighborScore::new(5, 0.1),
        ];

        let top = top_k(candidates, 3);

        let ids: Vec<RowId> = top.iter().map(|scored| scored.id).collect();
        assert_eq!(vec![2, 4, 3], ids);
    }

    #[test]
    fn should_handle_zero_and_oversized_k() {
        let candidates = vec![NeighborScore::new(1, 0.2), NeighborScore::new(2, 0.3)];
        assert!(top_k(candidates.clone(), 0).is_empty());
        assert_eq!(2, top_k(candidates, 10).len());
    }
}
