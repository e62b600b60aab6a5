//! Search Benchmarks
//!
//! Run with: cargo bench --bench search

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use nearsight::simd::dot_product;
use nearsight::FlatIndex;
use rand::Rng;

fn random_vector(dim: usize) -> Vec<f32> {
    let mut rng = rand::thread_rng();
    (0..dim).map(|_| rng.gen::<f32>() - 0.5).collect()
}

fn bench_dot_product(c: &mut Criterion) {
    let dims = [64, 128, 384, 768];

    let mut group = c.benchmark_group("dot_product");

    for dim in dims {
        group.throughput(Throughput::Elements(dim as u64));

        let a = random_vector(dim);
        let b = random_vector(dim);

        group.bench_function(format!("dim_{}", dim), |bencher| {
            bencher.iter(|| dot_product(black_box(&a), black_box(&b)))
        });
    }

    group.finish();
}

fn bench_flat_search(c: &mut Criterion) {
    let dim = 768;
    let sizes = [1_000usize, 10_000];

    let mut group = c.benchmark_group("flat_search_768");

    for n in sizes {
        let rows: Vec<Vec<f32>> = (0..n).map(|_| random_vector(dim)).collect();
        let mut index = FlatIndex::new(dim).unwrap();
        index.add(&rows).unwrap();
        let query = random_vector(dim);

        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::new("top10", n), &n, |bencher, _| {
            bencher.iter(|| index.search(black_box(&query), 10).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_dot_product, bench_flat_search);
criterion_main!(benches);
