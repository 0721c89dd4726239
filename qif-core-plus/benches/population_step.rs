//! Population step throughput: serial pass vs partitioned rayon pass.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use qif_core::model::{QIF_CURR_DELTA, QIF_SD};
use qif_core::{ModelDescriptor, Population, PopulationBuilder, RandomDistribution, TimestepContext};
use qif_core_plus::update_partitioned;

fn population(model: &'static ModelDescriptor, size: usize) -> Population {
    PopulationBuilder::new("bench", size, model)
        .set("i_offset", RandomDistribution::Uniform { low: 0.0, high: 12.0 })
        .seed(1)
        .build(TimestepContext::from_micros(100).unwrap())
        .unwrap()
}

fn bench_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("population_step");
    for model in [&QIF_CURR_DELTA, &QIF_SD] {
        for size in [1_000usize, 100_000] {
            group.throughput(Throughput::Elements(size as u64));

            let mut pop = population(model, size);
            group.bench_with_input(BenchmarkId::new(format!("{}/serial", model.name), size), &size, |b, _| {
                b.iter(|| black_box(pop.step().map(|s| s.len()).unwrap_or(0)))
            });

            let mut pop = population(model, size);
            group.bench_with_input(BenchmarkId::new(format!("{}/partitioned", model.name), size), &size, |b, _| {
                b.iter(|| {
                    black_box(
                        pop.step_with(|n, k, t| update_partitioned(n, k, t, 4096))
                            .map(|s| s.len())
                            .unwrap_or(0),
                    )
                })
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_step);
criterion_main!(benches);
