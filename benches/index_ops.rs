//! Benchmarks for the ranked store against a BTreeMap baseline.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use memidx::RankedSet;
use std::collections::BTreeMap;

fn generate_keys(n: usize) -> Vec<Vec<u8>> {
    (0..n)
        .map(|i| format!("member:{:08}", i).into_bytes())
        .collect()
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert");

    for size in [1_000, 10_000, 100_000] {
        let keys = generate_keys(size);

        group.bench_with_input(BenchmarkId::new("RankedSet", size), &keys, |b, keys| {
            b.iter(|| {
                let mut set = RankedSet::new();
                for (i, key) in keys.iter().enumerate() {
                    set.insert(key, (i % 1024) as f64);
                }
                black_box(set)
            });
        });

        group.bench_with_input(BenchmarkId::new("BTreeMap", size), &keys, |b, keys| {
            b.iter(|| {
                let mut map: BTreeMap<Vec<u8>, f64> = BTreeMap::new();
                for (i, key) in keys.iter().enumerate() {
                    map.insert(key.clone(), (i % 1024) as f64);
                }
                black_box(map)
            });
        });
    }

    group.finish();
}

fn bench_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("lookup");

    for size in [1_000, 10_000, 100_000] {
        let keys = generate_keys(size);

        let mut set = RankedSet::new();
        let mut map: BTreeMap<Vec<u8>, f64> = BTreeMap::new();
        for (i, key) in keys.iter().enumerate() {
            set.insert(key, (i % 1024) as f64);
            map.insert(key.clone(), (i % 1024) as f64);
        }

        group.bench_with_input(BenchmarkId::new("RankedSet", size), &keys, |b, keys| {
            b.iter(|| {
                for key in keys {
                    black_box(set.score(key));
                }
            });
        });

        group.bench_with_input(BenchmarkId::new("BTreeMap", size), &keys, |b, keys| {
            b.iter(|| {
                for key in keys {
                    black_box(map.get(key));
                }
            });
        });
    }

    group.finish();
}

fn bench_rank(c: &mut Criterion) {
    let mut group = c.benchmark_group("rank");

    for size in [1_000, 10_000, 100_000] {
        let keys = generate_keys(size);
        let mut set = RankedSet::new();
        for (i, key) in keys.iter().enumerate() {
            set.insert(key, (i % 1024) as f64);
        }

        group.bench_with_input(BenchmarkId::new("nth", size), &size, |b, &size| {
            b.iter(|| {
                for rank in (0..size).step_by(101) {
                    black_box(set.nth(rank));
                }
            });
        });

        group.bench_with_input(BenchmarkId::new("range", size), &size, |b, _| {
            b.iter(|| black_box(set.range(512.0, b"", 0, 100)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_insert, bench_lookup, bench_rank);
criterion_main!(benches);
