use criterion::{black_box, criterion_group, criterion_main, Criterion};
use collatz_orbit::*;
use num_bigint::BigInt;
use num_traits::One;

fn bench_path_27_i64(c: &mut Criterion) {
    let params = Params::default();

    c.bench_function("path 27 (i64)", |b| {
        b.iter(|| PathEngine::new(black_box(27i64), &params))
    });
}

fn bench_path_27_bigint(c: &mut Criterion) {
    let params = Params::default();
    let start = BigInt::from(27);

    c.bench_function("path 27 (bigint)", |b| {
        b.iter(|| PathEngine::new(black_box(start.clone()), &params))
    });
}

fn bench_path_2pow1000_minus1(c: &mut Criterion) {
    let params = Params::default();
    let start = (BigInt::one() << 1000u32) - BigInt::one();

    c.bench_function("path 2^1000-1 (bigint)", |b| {
        b.iter(|| PathEngine::new(black_box(start.clone()), &params))
    });
}

fn bench_flow_round_trip(c: &mut Criterion) {
    let params = Params::default();
    let path = PathEngine::new(79i64, &params);

    c.bench_function("flow -> parse 79", |b| {
        b.iter(|| {
            let class = black_box(&path).class_flow();
            parse_class::<i64>(&class, &params)
        })
    });
}

fn bench_tree_insert_orbits(c: &mut Criterion) {
    let params = Params::default();
    let orbits: Vec<OrbitPath> = (1..=3072i64)
        .map(|n| PathEngine::new(n, &params).orbit().clone())
        .collect();

    c.bench_function("tree insert 3072 orbits", |b| {
        b.iter(|| {
            let mut tree = FrequencyTree::new();
            for orbit in &orbits {
                let _ = tree.insert(orbit.clone());
            }
            tree.node_count()
        })
    });
}

fn bench_convergent_paths_10(c: &mut Criterion) {
    let params = Params::default();
    let scan = ScanSettings::default();

    c.bench_function("convergent paths length 10", |b| {
        b.iter(|| convergent_paths::<i64>(black_box(10), &params, &scan, |_| {}))
    });
}

criterion_group!(
    benches,
    bench_path_27_i64,
    bench_path_27_bigint,
    bench_path_2pow1000_minus1,
    bench_flow_round_trip,
    bench_tree_insert_orbits,
    bench_convergent_paths_10,
);
criterion_main!(benches);
