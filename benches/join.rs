// Benchmark joins over random indexes, and query parsing.

use criterion::{Criterion, criterion_group, criterion_main};
use joinery::prelude::*;
use joinery::testing::random_index;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::hint::black_box;

#[cfg(not(tarpaulin_include))]
fn join_bench(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(42);

    for (n_docs, n_values) in [(10_000, 100), (100_000, 10_000)] {
        let snapshot = random_index(&mut rng, n_docs, n_values, IndexConfig::default()).snapshot();

        let mut group = c.benchmark_group(format!("join-{}-docs-{}-values", n_docs, n_values));
        group.throughput(criterion::Throughput::Elements(1));

        for (name, sub) in [
            ("narrow", "id".has_i64(1)),
            ("kind", "kind".has_value("a")),
            ("all", Query::MatchAll),
        ] {
            let q = JoinQuery::new("id", "parent", sub);
            group.bench_function(name, |b| {
                b.iter(|| {
                    // A fresh weight computes the join each time.
                    let weight = JoinWeight::new(q.clone(), snapshot.clone());
                    black_box(weight.doc_set().unwrap());
                })
            });

            let weight = JoinWeight::new(q.clone(), snapshot.clone());
            weight.doc_set().unwrap();
            if let Some(stats) = weight.stats() {
                println!("{} {}:\n{}", n_docs, name, stats);
            }
        }

        group.bench_function("text", |b| {
            let q = JoinQuery::new("label", "link", "kind".has_value("b"));
            b.iter(|| {
                let weight = JoinWeight::new(q.clone(), snapshot.clone());
                black_box(weight.doc_set().unwrap());
            })
        });

        group.finish();
    }
}

#[cfg(not(tarpaulin_include))]
fn parsing_bench(c: &mut Criterion) {
    let schema = joinery::testing::random_schema();
    let parser = QueryParser::new(&schema);

    let mut group = c.benchmark_group("parsing-bench");
    group.throughput(criterion::Throughput::Elements(1));
    group.bench_function("parsing", |b| {
        b.iter(|| {
            black_box(
                parser
                    .parse("{!join from=id to=parent}{!join from=parent to=id}kind:a AND NOT label:v1*")
                    .unwrap(),
            );
        })
    });
    group.finish();
}

criterion_group!(benches, join_bench, parsing_bench);
criterion_main!(benches);
