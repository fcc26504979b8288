use std::collections::BTreeSet;

use hashbrown::hash_map::Entry;
use hashbrown::{HashMap, HashSet};
use serde_derive::Serialize;
use tracing::{debug, error, info};

use crate::catalog::{
    ActorId, GroupingId, InteractionRecord, ItemId, MarketplaceStore, SubjectKind,
};
use crate::config::AppConfig;
use crate::engine::assembler::{
    GroupRecommendation, GroupSummary, ItemRecommendation, ItemSummary, RankedGrouping,
    ResultAssembler,
};
use crate::engine::session::{FittedModel, ModelSession};
use crate::engine::strategies::{ActorsByItem, GroupingsByActor, ItemsByActor};
use crate::error::{InsufficientDataError, RecommendationError, RowNotFoundError};
use crate::knn::interaction_matrix::BuildReport;
use crate::knn::strategy::CellValue;
use crate::knn::{top_k, NeighborScore};

pub mod assembler;
pub mod session;
pub mod strategies;

const DEFAULT_NEIGHBORHOOD_SIZE_K: usize = 5;
const DEFAULT_MAX_GROUP_RECOMMENDATIONS: usize = 10;
const DEFAULT_ACTOR_SIMILARITY_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Recommendations per item or grouping query, and neighbors fetched per
    /// grouping in the actor's history.
    pub neighborhood_size_k: usize,
    pub max_group_recommendations: usize,
    /// Neighbors must be strictly more similar than this to contribute items.
    pub actor_similarity_threshold: f64,
    pub grouping_cell_value: CellValue,
    pub same_category_only: bool,
    pub exclude_interacted: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            neighborhood_size_k: DEFAULT_NEIGHBORHOOD_SIZE_K,
            max_group_recommendations: DEFAULT_MAX_GROUP_RECOMMENDATIONS,
            actor_similarity_threshold: DEFAULT_ACTOR_SIMILARITY_THRESHOLD,
            grouping_cell_value: CellValue::Presence,
            same_category_only: true,
            exclude_interacted: true,
        }
    }
}

impl From<&AppConfig> for EngineConfig {
    fn from(config: &AppConfig) -> Self {
        EngineConfig {
            neighborhood_size_k: config.model.neighborhood_size_k,
            max_group_recommendations: config.model.max_group_recommendations,
            actor_similarity_threshold: config.model.actor_similarity_threshold,
            grouping_cell_value: config.model.grouping_cell_value,
            same_category_only: config.logic.same_category_only,
            exclude_interacted: config.logic.exclude_interacted,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    Items,
    Groupings,
    Actors,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorMode {
    /// Restaurants similar to the ones the actor bought from.
    Groupings,
    /// Items bought by actors with a similar purchase history.
    Items,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemQuery {
    pub item_id: ItemId,
    pub actor_id: Option<ActorId>,
    pub k: Option<usize>,
}

impl ItemQuery {
    pub fn new(item_id: ItemId) -> Self {
        ItemQuery {
            item_id,
            actor_id: None,
            k: None,
        }
    }

    pub fn for_actor(mut self, actor_id: ActorId) -> Self {
        self.actor_id = Some(actor_id);
        self
    }

    pub fn with_k(mut self, k: usize) -> Self {
        self.k = Some(k);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelSummary {
    pub kind: ModelKind,
    pub qty_rows: usize,
    pub qty_cols: usize,
    pub report: BuildReport,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemRecommendations {
    pub item: ItemSummary,
    pub recommendations: Vec<ItemRecommendation>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupRecommendations {
    pub group: GroupSummary,
    pub recommendations: Vec<GroupRecommendation>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedSubjects {
    Groupings(Vec<GroupRecommendation>),
    Items(Vec<ItemRecommendation>),
}

impl RecommendedSubjects {
    pub fn len(&self) -> usize {
        match self {
            RecommendedSubjects::Groupings(groupings) => groupings.len(),
            RecommendedSubjects::Items(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActorRecommendations {
    pub actor_id: ActorId,
    pub mode: ActorMode,
    pub groupings_from_history: Vec<GroupingId>,
    pub recommendations: RecommendedSubjects,
}

/// Serves recommendations from a marketplace store.
///
/// Holds no model state: every call reads the completed purchases, builds a
/// fresh interaction matrix, fits a fresh index and discards both before
/// returning. Data sparsity is reported as `InsufficientData`, never as a
/// hard failure.
pub struct RecommendationEngine<'s, S: ?Sized> {
    store: &'s S,
    config: EngineConfig,
}

impl<'s, S: MarketplaceStore + ?Sized> RecommendationEngine<'s, S> {
    pub fn new(store: &'s S, config: EngineConfig) -> Self {
        RecommendationEngine { store, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Builds a model over all completed purchases and reports its shape.
    pub fn initialize(&self, kind: ModelKind) -> Result<ModelSummary, InsufficientDataError> {
        let records = self.store.list_completed_interactions(None);
        let model = match kind {
            ModelKind::Items => ModelSession::new(ItemsByActor::new(self.store)).initialize(&records),
            ModelKind::Groupings => ModelSession::new(self.grouping_strategy()).initialize(&records),
            ModelKind::Actors => ModelSession::new(ActorsByItem::new(self.store)).initialize(&records),
        }?;

        let matrix = model.index().matrix();
        let summary = ModelSummary {
            kind,
            qty_rows: matrix.qty_rows(),
            qty_cols: matrix.qty_cols(),
            report: model.report().clone(),
        };
        info!(
            kind = ?summary.kind,
            qty_rows = summary.qty_rows,
            qty_cols = summary.qty_cols,
            qty_missing_fields = summary.report.qty_missing_fields,
            "initialized recommendation model"
        );
        Ok(summary)
    }

    /// Items similar to the given item, scoped to items of restaurants in the
    /// same category. Items the actor already bought are left out when an
    /// actor is given.
    pub fn recommendations_for_item(
        &self,
        query: &ItemQuery,
    ) -> Result<ItemRecommendations, RecommendationError> {
        let item = self
            .store
            .get_item(query.item_id)
            .ok_or(RecommendationError::NotFound {
                kind: SubjectKind::Item,
                id: query.item_id,
            })?;
        let subject = ItemSummary::from(&item);

        let category = match self.store.get_grouping(item.grouping_id) {
            Some(grouping) if !grouping.category.trim().is_empty() => grouping.category,
            Some(_) => {
                error!(
                    item_id = item.id,
                    grouping_id = item.grouping_id,
                    "grouping of item has no category"
                );
                return Ok(ItemRecommendations::empty(subject));
            }
            None => {
                error!(
                    item_id = item.id,
                    grouping_id = item.grouping_id,
                    "item references a missing grouping"
                );
                return Ok(ItemRecommendations::empty(subject));
            }
        };

        let scope = self.category_scope(&category);
        let records = self.store.list_completed_interactions(Some(&scope));
        let model = ModelSession::new(ItemsByActor::scoped(self.store, scope)).initialize(&records)?;

        let excluded: HashSet<ItemId> = match query.actor_id {
            Some(actor_id) if self.config.exclude_interacted => self
                .store
                .get_actor_interactions(actor_id)
                .into_iter()
                .collect(),
            _ => HashSet::new(),
        };

        let k = query.k.unwrap_or(self.config.neighborhood_size_k);
        let ranked: Vec<NeighborScore> = model
            .index()
            .query(item.id, k.saturating_add(excluded.len()))?
            .into_iter()
            .filter(|neighbor| !excluded.contains(&neighbor.id))
            .collect();

        let mut recommendations = ResultAssembler::new(self.store)
            .with_purchase_counts(purchase_counts(&records))
            .items(&ranked);
        recommendations.truncate(k);

        debug!(
            item_id = item.id,
            category = %category,
            qty_recommendations = recommendations.len(),
            "served item recommendations"
        );
        Ok(ItemRecommendations {
            item: subject,
            recommendations,
        })
    }

    /// Restaurants whose customers overlap with the given restaurant's.
    pub fn recommendations_for_group(
        &self,
        grouping_id: GroupingId,
        k: Option<usize>,
    ) -> Result<GroupRecommendations, RecommendationError> {
        let grouping = self
            .store
            .get_grouping(grouping_id)
            .ok_or(RecommendationError::NotFound {
                kind: SubjectKind::Grouping,
                id: grouping_id,
            })?;

        let model = self.grouping_model()?;
        let index = model.index();
        let k = k.unwrap_or(self.config.neighborhood_size_k);

        // Ask for every row: the category filter runs after ranking.
        let ranked: Vec<RankedGrouping> = index
            .query(grouping_id, index.matrix().qty_rows())?
            .into_iter()
            .filter(|neighbor| self.passes_category_rule(&grouping.category, neighbor.id))
            .take(k)
            .map(|score| RankedGrouping {
                score,
                based_on: None,
            })
            .collect();

        let recommendations = ResultAssembler::new(self.store).groupings(&ranked);
        Ok(GroupRecommendations {
            group: GroupSummary::from(&grouping),
            recommendations,
        })
    }

    pub fn recommendations_for_actor(
        &self,
        actor_id: ActorId,
        mode: ActorMode,
    ) -> Result<ActorRecommendations, RecommendationError> {
        let history = self.store.get_actor_interactions(actor_id);
        let groupings_from_history: BTreeSet<GroupingId> = history
            .iter()
            .filter_map(|item_id| self.store.get_item(*item_id))
            .map(|item| item.grouping_id)
            .collect();
        if history.is_empty() || groupings_from_history.is_empty() {
            return Err(InsufficientDataError::NoHistory { actor_id }.into());
        }

        let recommendations = match mode {
            ActorMode::Groupings => RecommendedSubjects::Groupings(
                self.neighbor_groupings(&groupings_from_history)?,
            ),
            ActorMode::Items => RecommendedSubjects::Items(self.neighbor_items(actor_id)?),
        };

        debug!(
            actor_id,
            mode = ?mode,
            qty_recommendations = recommendations.len(),
            "served actor recommendations"
        );
        Ok(ActorRecommendations {
            actor_id,
            mode,
            groupings_from_history: groupings_from_history.into_iter().collect(),
            recommendations,
        })
    }

    /// Unions the neighbors of each grouping in the actor's history. All
    /// queries run against one fitted matrix, so their scores are directly
    /// comparable; a grouping reached from several bases keeps its best score.
    fn neighbor_groupings(
        &self,
        own_groupings: &BTreeSet<GroupingId>,
    ) -> Result<Vec<GroupRecommendation>, RecommendationError> {
        let model = self.grouping_model()?;
        let index = model.index();

        let mut best: HashMap<GroupingId, RankedGrouping> = HashMap::new();
        let mut qty_matched_bases = 0_usize;
        for base_id in own_groupings.iter() {
            let neighbors = match index.query(*base_id, self.config.neighborhood_size_k) {
                Ok(neighbors) => neighbors,
                Err(not_found) => {
                    debug!(%not_found, "skipping grouping from actor history");
                    continue;
                }
            };
            qty_matched_bases += 1;

            let base_category = self
                .store
                .get_grouping(*base_id)
                .map(|grouping| grouping.category);
            for neighbor in neighbors {
                if self.config.exclude_interacted && own_groupings.contains(&neighbor.id) {
                    continue;
                }
                if let Some(category) = base_category.as_deref() {
                    if !self.passes_category_rule(category, neighbor.id) {
                        continue;
                    }
                } else if self.config.same_category_only {
                    continue;
                }

                let candidate = RankedGrouping {
                    score: neighbor,
                    based_on: Some(*base_id),
                };
                match best.entry(neighbor.id) {
                    Entry::Vacant(entry) => {
                        entry.insert(candidate);
                    }
                    Entry::Occupied(mut entry) => {
                        if neighbor.score > entry.get().score.score {
                            entry.insert(candidate);
                        }
                    }
                }
            }
        }

        if qty_matched_bases == 0 {
            let first = own_groupings.iter().next().copied().unwrap_or_default();
            return Err(RowNotFoundError { row_id: first }.into());
        }

        let ranked: Vec<RankedGrouping> = top_k(
            best.values().map(|ranked| ranked.score),
            self.config.max_group_recommendations,
        )
        .into_iter()
        .filter_map(|score| best.get(&score.id).copied())
        .collect();

        Ok(ResultAssembler::new(self.store).groupings(&ranked))
    }

    /// Every item bought by an actor above the similarity threshold but not
    /// by the actor, each scored by its most similar contributing neighbor.
    fn neighbor_items(&self, actor_id: ActorId) -> Result<Vec<ItemRecommendation>, RecommendationError> {
        let records = self.store.list_completed_interactions(None);
        let model = ModelSession::new(ActorsByItem::new(self.store)).initialize(&records)?;
        let index = model.index();
        let matrix = index.matrix();

        let neighbors = index.query(actor_id, matrix.qty_rows())?;
        let own_items: HashSet<ItemId> = matrix.interacted_cols(actor_id).into_iter().collect();

        let mut best: HashMap<ItemId, f64> = HashMap::new();
        for neighbor in neighbors
            .iter()
            .filter(|neighbor| neighbor.score > self.config.actor_similarity_threshold)
        {
            for item_id in matrix.interacted_cols(neighbor.id) {
                if own_items.contains(&item_id) {
                    continue;
                }
                let score = best.entry(item_id).or_insert(0.0);
                if neighbor.score > *score {
                    *score = neighbor.score;
                }
            }
        }

        let qty_items = best.len();
        let ranked = top_k(
            best.into_iter()
                .map(|(item_id, score)| NeighborScore::new(item_id, score)),
            qty_items,
        );
        Ok(ResultAssembler::new(self.store)
            .with_purchase_counts(purchase_counts(&records))
            .items(&ranked))
    }

    fn grouping_strategy(&self) -> GroupingsByActor<'s, S> {
        GroupingsByActor::new(self.store, self.config.grouping_cell_value)
    }

    fn grouping_model(&self) -> Result<FittedModel, InsufficientDataError> {
        let records = self.store.list_completed_interactions(None);
        Ok(ModelSession::new(self.grouping_strategy()).initialize(&records)?)
    }

    fn category_scope(&self, category: &str) -> HashSet<ItemId> {
        self.store
            .groupings_in_category(category)
            .into_iter()
            .flat_map(|grouping_id| self.store.items_in_grouping(grouping_id))
            .collect()
    }

    fn passes_category_rule(&self, category: &str, grouping_id: GroupingId) -> bool {
        if !self.config.same_category_only {
            return true;
        }
        self.store
            .get_grouping(grouping_id)
            .map_or(false, |grouping| grouping.category == category)
    }
}

/// Completed purchase rows per item.
fn purchase_counts(records: &[InteractionRecord]) -> HashMap<ItemId, usize> {
    let mut counts = HashMap::new();
    for record in records {
        *counts.entry(record.item_id).or_insert(0) += 1;
    }
    counts
}

impl ItemRecommendations {
    fn empty(item: ItemSummary) -> Self {
        ItemRecommendations {
            item,
            recommendations: Vec::new(),
        }
    }
}
