#[macro_use]
extern crate bencher;
extern crate marketplace_recs;
extern crate rand;
extern crate rand_pcg;

use bencher::Bencher;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;

use marketplace_recs::catalog::InteractionRecord;
use marketplace_recs::knn::interaction_matrix::build;
use marketplace_recs::knn::similarity_index::SimilarityIndex;
use marketplace_recs::knn::strategy::SubjectsByActor;

benchmark_group!(benches, bench_build_matrix, bench_query_index);
benchmark_main!(benches);

const NUM_RECORDS: usize = 20_000;
const NUM_ACTORS: u64 = 2_000;
const NUM_ITEMS: u64 = 500;
const NEIGHBORHOOD_SIZE_K: usize = 5;

fn synthetic_records() -> Vec<InteractionRecord> {
    let mut rng = Pcg64::seed_from_u64(42);
    (0..NUM_RECORDS)
        .map(|_| InteractionRecord {
            actor_id: rng.gen_range(0..NUM_ACTORS),
            item_id: rng.gen_range(0..NUM_ITEMS),
            quantity: rng.gen_range(1..4),
        })
        .collect()
}

fn bench_build_matrix(bench: &mut Bencher) {
    let records = synthetic_records();
    let strategy = SubjectsByActor::default();

    bench.iter(|| {
        bencher::black_box(build(&records, &strategy).unwrap());
    });
}

fn bench_query_index(bench: &mut Bencher) {
    let (matrix, _) = build(&synthetic_records(), &SubjectsByActor::default()).unwrap();
    let row_ids = matrix.row_ids().to_vec();
    let index = SimilarityIndex::fit(matrix);
    let mut rng = Pcg64::seed_from_u64(7);

    bench.iter(|| {
        let row_id = row_ids[rng.gen_range(0..row_ids.len())];
        bencher::black_box(index.query(row_id, NEIGHBORHOOD_SIZE_K).unwrap());
    });
}
