use joinery::prelude::*;
use joinery::testing::{brute_force_doc_set, brute_force_join, random_index};
use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;

fn hits(snapshot: &Snapshot, q: &Query) -> Vec<DocId> {
    snapshot
        .search(q)
        .unwrap()
        .into_iter()
        .map(|(d, _)| d)
        .collect()
}

// Configurations pushing the join through all its code paths.
fn configs() -> Vec<IndexConfig> {
    vec![
        IndexConfig::default(),
        IndexConfig::builder().small_set_shift(0).build(),
        IndexConfig::builder()
            .small_set_shift(0)
            .min_doc_freq_floor(1)
            .max_sorted_floor(1000)
            .build(),
        IndexConfig::builder()
            .min_doc_freq_floor(u32::MAX)
            .max_sorted_floor(0)
            .read_batch_size(1)
            .build(),
        IndexConfig::builder()
            .small_set_shift(2)
            .min_doc_freq_floor(2)
            .max_sorted_floor(3)
            .term_cache_capacity(0)
            .query_cache_capacity(0)
            .build(),
    ]
}

static JOINS: [(&str, &str); 5] = [
    ("id", "parent"),
    ("parent", "id"),
    ("id", "id"),
    ("label", "link"),
    ("link", "label"),
];

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn test_join_matches_brute_force(
        seed in any::<u64>(),
        n_docs in 0..120usize,
        n_values in 1..30i64,
        join in 0..JOINS.len(),
    ) {
        let (from, to) = JOINS[join];
        let mut rng = StdRng::seed_from_u64(seed);
        let sub = Query::random(&mut rng, n_values, 1);

        let mut results = vec![];
        for config in configs() {
            // Same seed, same documents and deletions.
            let mut rng = StdRng::seed_from_u64(seed);
            let snapshot = random_index(&mut rng, n_docs, n_values, config).snapshot();
            let expected = brute_force_join(&snapshot, from, to, &sub);
            let q = sub.clone().join(from, to);
            let got = hits(&snapshot, &q);
            prop_assert_eq!(&got, &expected, "{} with {:?}", q, snapshot.config());
            for d in got.iter() {
                prop_assert!(snapshot.is_live(*d));
            }
            results.push(got);
        }
        // Whatever the code path, the same documents.
        prop_assert!(results.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn test_random_queries_match_brute_force(
        seed in any::<u64>(),
        n_docs in 0..60usize,
        n_values in 1..10i64,
    ) {
        let mut rng = StdRng::seed_from_u64(seed);
        let q = Query::random(&mut rng, n_values, 2);
        let snapshot = random_index(&mut rng, n_docs, n_values, IndexConfig::default()).snapshot();
        prop_assert_eq!(hits(&snapshot, &q), brute_force_doc_set(&snapshot, &q), "{}", q);
    }

    #[test]
    fn test_join_is_idempotent(seed in any::<u64>(), n_docs in 1..80usize) {
        let mut rng = StdRng::seed_from_u64(seed);
        let snapshot = random_index(&mut rng, n_docs, 8, IndexConfig::default()).snapshot();
        let q = Query::random(&mut rng, 8, 1).join("id", "parent");
        let first = hits(&snapshot, &q);
        prop_assert_eq!(hits(&snapshot, &q), first.clone());
        prop_assert_eq!(snapshot.search_threaded(&q).unwrap().len(), first.len());
    }
}
