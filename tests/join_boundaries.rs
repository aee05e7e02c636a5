// Document frequencies sitting around the join thresholds.
use joinery::prelude::*;
use joinery::testing::brute_force_join;

fn schema() -> Schema {
    Schema::new()
        .with_text("side")
        .with_i64("pid")
        .with_i64("external_id")
}

// For each value v, from_dfs[v] documents with pid=v
// and to_dfs[v] documents with external_id=v.
fn build(config: IndexConfig, from_dfs: &[usize], to_dfs: &[usize]) -> Snapshot {
    let mut index = Index::with_config(schema(), config);
    for (v, df) in from_dfs.iter().enumerate() {
        for _ in 0..*df {
            index
                .index_document(&[("side", "from"), ("pid", v.to_string().as_str())].into())
                .unwrap();
        }
    }
    index.commit();
    for (v, df) in to_dfs.iter().enumerate() {
        for _ in 0..*df {
            index
                .index_document(&[("side", "to"), ("external_id", v.to_string().as_str())].into())
                .unwrap();
        }
    }
    index.commit();
    index.snapshot()
}

fn join_ids(snapshot: &Snapshot) -> Vec<DocId> {
    let q = "side".has_value("from").join("pid", "external_id");
    snapshot
        .search(&q)
        .unwrap()
        .into_iter()
        .map(|(d, _)| d)
        .collect()
}

fn join_stats(snapshot: &Snapshot) -> JoinStats {
    let q = JoinQuery::new("pid", "external_id", "side".has_value("from"));
    let w = JoinWeight::new(q, snapshot.clone());
    w.doc_set().unwrap();
    w.stats().cloned().unwrap()
}

fn configs() -> Vec<IndexConfig> {
    vec![
        IndexConfig::default(),
        IndexConfig::builder().small_set_shift(0).build(),
        IndexConfig::builder()
            .small_set_shift(0)
            .min_doc_freq_floor(0)
            .build(),
        IndexConfig::builder()
            .small_set_shift(0)
            .min_doc_freq_floor(u32::MAX)
            .build(),
        IndexConfig::builder()
            .small_set_shift(0)
            .max_sorted_floor(u32::MAX)
            .build(),
    ]
}

fn check_all(from_dfs: &[usize], to_dfs: &[usize]) {
    let mut results = vec![];
    for config in configs() {
        let snapshot = build(config, from_dfs, to_dfs);
        let got = join_ids(&snapshot);
        let expected = brute_force_join(
            &snapshot,
            "pid",
            "external_id",
            &"side".has_value("from"),
        );
        assert_eq!(got, expected, "{:?} {:?}", from_dfs, to_dfs);
        results.push(got);
    }
    assert!(results.windows(2).all(|w| w[0] == w[1]));
}

#[test]
fn test_around_min_doc_freq() {
    // The default min doc freq is 5 on such small indexes.
    for df in [4, 5, 6] {
        check_all(&[df], &[df]);
        check_all(&[df, 1], &[1, df]);
        check_all(&[1, df, 0], &[df, 0, df]);
    }
}

#[test]
fn test_around_max_sorted_size() {
    // The default max sorted size is 10: accumulated sizes of 9, 10 and 11.
    for total in [9, 10, 11] {
        check_all(&[1, 1], &[5, total - 5]);
        check_all(&[1, 1, 1], &[3, 3, total - 6]);
        check_all(&[1; 11], &[1; 11][..total]);
    }
}

#[test]
fn test_bitset_switch_points() {
    let list_only = IndexConfig::builder().small_set_shift(0).build();

    // 4 + 5 <= 10: two sorted sets merged.
    let stats = join_stats(&build(list_only.clone(), &[1, 1], &[4, 5]));
    assert!(!stats.bitset_mode());
    assert_eq!(stats.result_size(), 9);

    // 5 + 5 stays at the limit.
    let stats = join_stats(&build(list_only.clone(), &[1, 1], &[5, 5]));
    assert!(!stats.bitset_mode());

    // 5 + 6 goes over it.
    let stats = join_stats(&build(list_only.clone(), &[1, 1], &[5, 6]));
    assert!(stats.bitset_mode());
    assert_eq!(stats.result_size(), 11);

    // A single set never switches, whatever its size.
    let stats = join_stats(&build(list_only, &[1], &[11]));
    assert!(!stats.bitset_mode());
    assert_eq!(stats.to_terms(), 1);
}

#[test]
fn test_direct_scans_below_min_doc_freq() {
    let list_only = IndexConfig::builder().small_set_shift(0).build();

    // From terms under 5 documents are scanned.
    let stats = join_stats(&build(list_only.clone(), &[4], &[1]));
    assert_eq!(stats.direct_scans(), 1);
    assert_eq!(stats.cached_lookups(), 0);

    // From terms of 5 documents go through the term cache.
    let stats = join_stats(&build(list_only, &[5], &[1]));
    assert_eq!(stats.direct_scans(), 0);
    assert_eq!(stats.cached_lookups(), 1);
    assert_eq!(stats.intersecting_terms(), 1);
}
