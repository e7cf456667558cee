//! Benchmarks for permutation attribution on tabular models.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::Array2;
use rand::prelude::*;
use shap_rust::*;

fn background(rows: usize, features: usize) -> Array2<f64> {
    let mut rng = StdRng::seed_from_u64(42);
    Array2::from_shape_fn((rows, features), |_| rng.gen_range(-1.0..1.0))
}

fn product_model(features: usize) -> FnModel {
    FnModel::tabular(1, move |x| {
        let linear: f64 = x.iter().enumerate().map(|(j, v)| (j + 1) as f64 * v).sum();
        vec![linear + x[0] * x[features - 1]]
    })
    .concurrent(true)
}

fn bench_explain_features(c: &mut Criterion) {
    let mut group = c.benchmark_group("permutation_explain");

    for features in [4, 16, 64].iter() {
        let explainer = Explainer::builder()
            .seed(7)
            .max_evals(2_000)
            .build(product_model(*features), background(50, *features))
            .unwrap();
        let instance = Instance::tabular(&vec![0.5; *features]);

        group.bench_with_input(BenchmarkId::from_parameter(features), features, |b, _| {
            b.iter(|| explainer.explain(black_box(&instance)).unwrap());
        });
    }

    group.finish();
}

fn bench_explain_workers(c: &mut Criterion) {
    let mut group = c.benchmark_group("permutation_workers");

    for workers in [1, 2, 4].iter() {
        let explainer = Explainer::builder()
            .seed(7)
            .num_workers(*workers)
            .max_evals(4_000)
            .build(product_model(16), background(100, 16))
            .unwrap();
        let instance = Instance::tabular(&[0.25; 16]);

        group.bench_with_input(BenchmarkId::from_parameter(workers), workers, |b, _| {
            b.iter(|| explainer.explain(black_box(&instance)).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_explain_features, bench_explain_workers);
criterion_main!(benches);
