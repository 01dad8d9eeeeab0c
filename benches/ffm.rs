use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use linfa::prelude::*;
use linfa_ffm::engine;
use linfa_ffm::{Ffm, Node, SparseRows, WeightStore};
use ndarray::Array1;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;

const NFEATURES: usize = 10_000;

fn generate_rows(nfields: usize, nsamples: usize) -> DatasetBase<SparseRows<f32>, Array1<bool>> {
    let mut rng = Xoshiro256Plus::seed_from_u64(42);
    let rows = (0..nsamples)
        .map(|_| {
            (0..nfields)
                .map(|field| Node::new(field, rng.gen_range(0..NFEATURES), 1.0))
                .collect()
        })
        .collect();
    let labels = (0..nsamples).map(|_| rng.gen()).collect::<Array1<bool>>();
    DatasetBase::new(SparseRows::with_shape(rows, NFEATURES, nfields), labels)
}

fn bench_engine(c: &mut Criterion) {
    let mut group = c.benchmark_group("FFM engine");
    let mut rng = Xoshiro256Plus::seed_from_u64(42);
    for latent_dim in [4, 16, 64] {
        let mut store = WeightStore::<f32>::allocate(NFEATURES, 8, latent_dim, false, &mut rng).unwrap();
        let dataset = generate_rows(8, 1);
        let row = dataset.records().row(0).to_vec();
        group.bench_with_input(BenchmarkId::new("score", latent_dim), &row, |b, row| {
            b.iter(|| engine::score(black_box(row), 1.0, &store));
        });
        group.bench_with_input(BenchmarkId::new("update", latent_dim), &row, |b, row| {
            b.iter(|| engine::update(black_box(row), 1.0, &mut store, -0.3, 0.1, 2e-5));
        });
    }
    group.finish();
}

fn bench_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("FFM fit");
    group.sample_size(10);
    for nsamples in [1_000, 10_000] {
        let dataset = generate_rows(8, nsamples);
        group.bench_with_input(BenchmarkId::new("fit", nsamples), &dataset, |b, dataset| {
            b.iter(|| {
                Ffm::<f32>::params()
                    .iterations(1)
                    .quiet(true)
                    .fit(dataset)
                    .unwrap()
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_engine, bench_fit);
criterion_main!(benches);
