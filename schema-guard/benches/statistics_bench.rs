//! Benchmarks for the statistics pass and validation.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use schema_guard::core::{Record, Value};
use schema_guard::schema::SchemaInferencer;
use schema_guard::statistics::StatisticsComputer;
use schema_guard::validation::Validator;
use std::hint::black_box;
use tokio::runtime::Runtime;

const PAYMENT_TYPES: [&str; 4] = ["Cash", "Credit Card", "Mobile", "Voucher"];

fn generate_records(rows: usize, seed: u64) -> Vec<Record> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..rows)
        .map(|i| {
            let tip = if rng.random_bool(0.1) {
                Value::Null
            } else {
                Value::from(rng.random_range(0.0..25.0))
            };
            Record::new()
                .with("trip_id", i as i64)
                .with("payment_type", PAYMENT_TYPES[rng.random_range(0..PAYMENT_TYPES.len())])
                .with("fare", rng.random_range(2.5..150.0))
                .with("tips", tip)
                .with("shared", rng.random_bool(0.3))
        })
        .collect()
}

fn bench_compute(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("compute");

    for rows in [1_000, 10_000, 100_000] {
        let records = generate_records(rows, 7);
        group.throughput(Throughput::Elements(rows as u64));

        group.bench_with_input(BenchmarkId::new("sequential", rows), &records, |b, records| {
            let computer = StatisticsComputer::new();
            b.iter(|| computer.compute(black_box(records)).unwrap())
        });

        group.bench_with_input(BenchmarkId::new("partitioned", rows), &records, |b, records| {
            let computer = StatisticsComputer::builder().partitions(4).build();
            b.iter(|| {
                rt.block_on(computer.compute_partitioned(black_box(records.clone())))
                    .unwrap()
            })
        });
    }

    group.finish();
}

fn bench_validate(c: &mut Criterion) {
    let computer = StatisticsComputer::new();
    let previous = computer.compute(&generate_records(10_000, 1)).unwrap();
    let current = computer.compute(&generate_records(10_000, 2)).unwrap();

    let mut schema = SchemaInferencer::new().infer(&previous);
    schema
        .edit()
        .set_drift_threshold("payment_type", 0.05)
        .unwrap()
        .set_drift_threshold("fare", 0.05)
        .unwrap()
        .set_presence_threshold("tips", 0.95)
        .unwrap();

    let validator = Validator::new();
    c.bench_function("validate_with_drift", |b| {
        b.iter(|| validator.validate(black_box(&current), &schema, Some(&previous), None))
    });
}

criterion_group!(benches, bench_compute, bench_validate);
criterion_main!(benches);
