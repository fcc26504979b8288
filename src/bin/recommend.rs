use anyhow::{anyhow, bail, Context};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use marketplace_recs::catalog::memory_store::MemoryStore;
use marketplace_recs::config::AppConfig;
use marketplace_recs::engine::assembler::{GroupRecommendation, ItemRecommendation};
use marketplace_recs::engine::{
    ActorMode, EngineConfig, ItemQuery, ModelKind, RecommendationEngine, RecommendedSubjects,
};
use marketplace_recs::error::RecommendationError;
use marketplace_recs::stats::determine_interaction_statistics;
use marketplace_recs::stopwatch::Stopwatch;

const USAGE: &str = "usage: recommend <config> <command>\n\
    commands:\n  \
    init [items|groupings|actors]\n  \
    item <item_id> [actor_id] [k]\n  \
    group <grouping_id> [k]\n  \
    actor <actor_id> [groupings|items]";

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let config_path = args.get(0).cloned().unwrap_or_default();
    let config = AppConfig::new(&config_path)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log.level)),
        )
        .init();

    let store = MemoryStore::from_csv(&config.data).context("loading marketplace data failed")?;
    determine_interaction_statistics("purchases", store.purchases()).log();

    let engine = RecommendationEngine::new(&store, EngineConfig::from(&config));
    let command: Vec<&str> = args.iter().skip(1).map(String::as_str).collect();

    let mut stopwatch = Stopwatch::new();
    stopwatch.start();
    let label = run(&engine, &command)?;
    stopwatch.stop(label);
    info!(
        command = label,
        latency_micros = stopwatch.get_percentile_in_micros(1.0),
        "done"
    );
    Ok(())
}

fn run(engine: &RecommendationEngine<MemoryStore>, command: &[&str]) -> anyhow::Result<&'static str> {
    match command {
        ["init", ..] => {
            let kind = match command.get(1).copied().unwrap_or("items") {
                "items" => ModelKind::Items,
                "groupings" => ModelKind::Groupings,
                "actors" => ModelKind::Actors,
                other => bail!("unknown model kind {}\n{}", other, USAGE),
            };
            let summary = engine.initialize(kind)?;
            println!(
                "{:?} model: {} rows x {} columns ({} records, {} out of scope, {} missing fields)",
                summary.kind,
                summary.qty_rows,
                summary.qty_cols,
                summary.report.qty_records,
                summary.report.qty_out_of_scope,
                summary.report.qty_missing_fields
            );
            Ok("init")
        }
        ["item", item_id, rest @ ..] => {
            let mut query = ItemQuery::new(parse_id(item_id)?);
            if let Some(actor_id) = rest.get(0) {
                query = query.for_actor(parse_id(actor_id)?);
            }
            if let Some(k) = rest.get(1) {
                query = query.with_k(k.parse::<usize>().with_context(|| format!("invalid k {}", k))?);
            }
            match soft(engine.recommendations_for_item(&query))? {
                Some(result) => {
                    println!("Similar to {} ({}):", result.item.title, result.item.id);
                    print_items(&result.recommendations);
                }
                None => println!("Not enough purchases to recommend anything yet."),
            }
            Ok("item")
        }
        ["group", grouping_id, rest @ ..] => {
            let k = match rest.get(0) {
                Some(k) => Some(k.parse::<usize>().with_context(|| format!("invalid k {}", k))?),
                None => None,
            };
            match soft(engine.recommendations_for_group(parse_id(grouping_id)?, k))? {
                Some(result) => {
                    println!("Similar to {} ({}):", result.group.name, result.group.id);
                    print_groupings(&result.recommendations);
                }
                None => println!("Not enough purchases to recommend anything yet."),
            }
            Ok("group")
        }
        ["actor", actor_id, rest @ ..] => {
            let mode = match rest.get(0).copied().unwrap_or("groupings") {
                "groupings" => ActorMode::Groupings,
                "items" => ActorMode::Items,
                other => bail!("unknown actor mode {}\n{}", other, USAGE),
            };
            match soft(engine.recommendations_for_actor(parse_id(actor_id)?, mode))? {
                Some(result) => {
                    println!(
                        "For actor {} (bought from {:?}):",
                        result.actor_id, result.groupings_from_history
                    );
                    match &result.recommendations {
                        RecommendedSubjects::Groupings(groupings) => print_groupings(groupings),
                        RecommendedSubjects::Items(items) => print_items(items),
                    }
                }
                None => println!("Not enough purchases to recommend anything yet."),
            }
            Ok("actor")
        }
        _ => Err(anyhow!("{}", USAGE)),
    }
}

/// Turns data sparsity into an empty answer; other errors stay errors.
fn soft<T>(result: Result<T, RecommendationError>) -> anyhow::Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(error) if error.is_insufficient_data() => {
            warn!(%error, "returning no recommendations");
            Ok(None)
        }
        Err(error) => Err(error.into()),
    }
}

fn parse_id(raw: &str) -> anyhow::Result<u64> {
    raw.parse::<u64>().with_context(|| format!("invalid id {}", raw))
}

fn print_items(recommendations: &[ItemRecommendation]) {
    for r in recommendations {
        println!(
            "  {:>8}  {:.3}  {} @ {} (ordered {} times)",
            r.item_id, r.similarity_score, r.title, r.grouping_name, r.qty_purchases
        );
    }
}

fn print_groupings(recommendations: &[GroupRecommendation]) {
    for r in recommendations {
        let based_on = r
            .based_on
            .as_ref()
            .map(|base| format!(" (because of {})", base.name))
            .unwrap_or_default();
        println!(
            "  {:>8}  {:.3}  {} [{}] {}{}",
            r.grouping_id,
            r.similarity_score,
            r.name,
            r.category,
            r.address.as_deref().unwrap_or("-"),
            based_on
        );
    }
}
