//! Protocol Benchmarks - uncontended cost per engine
//!
//! ## Benchmark Path Types
//!
//! - `txn_lifecycle/*`: begin + one write + commit through the facade
//! - `validate/*`: one more object validated inside a long-running transaction
//! - `batch/*`: `validate_objects` over N distinct objects
//!
//! Every path is single-threaded, so the numbers measure bookkeeping
//! overhead (lock table, watermarks, read/write sets), not contention.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use strata_concurrency::ConcurrencyControlManager;
use strata_core::{Action, Algorithm};

const ALGORITHMS: [Algorithm; 3] = [Algorithm::Lock, Algorithm::Timestamp, Algorithm::Validation];

fn manager(algorithm: Algorithm) -> ConcurrencyControlManager {
    let manager = ConcurrencyControlManager::with_algorithm(algorithm);
    manager
        .initialize()
        .expect("initialize never fails for a fresh manager");
    manager
}

fn txn_lifecycle_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("txn_lifecycle");
    group.throughput(Throughput::Elements(1));

    for algorithm in ALGORITHMS {
        let m = manager(algorithm);
        let mut i = 0u64;
        group.bench_function(BenchmarkId::from_parameter(algorithm), |b| {
            b.iter(|| {
                i += 1;
                let tx = m.begin_transaction().unwrap();
                let object_id = format!("row/{}", i % 1024);
                let outcome = m.validate_object(&object_id, tx, Action::Write);
                black_box(m.end_transaction(tx, outcome.allowed).unwrap())
            });
        });
    }

    group.finish();
}

fn validate_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("validate");
    group.throughput(Throughput::Elements(1));

    for algorithm in ALGORITHMS {
        let m = manager(algorithm);
        let tx = m.begin_transaction().unwrap();
        let mut i = 0u64;
        group.bench_function(BenchmarkId::from_parameter(algorithm), |b| {
            b.iter(|| {
                i += 1;
                let object_id = format!("obj/{}", i);
                black_box(m.validate_object(&object_id, tx, Action::Read).allowed)
            });
        });
        m.end_transaction(tx, false).unwrap();
    }

    group.finish();
}

fn batch_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch");

    for size in [10usize, 100] {
        let objects: Vec<String> = (0..size).map(|i| format!("batch/{}", i)).collect();
        group.throughput(Throughput::Elements(size as u64));

        for algorithm in ALGORITHMS {
            let m = manager(algorithm);
            group.bench_with_input(
                BenchmarkId::new(algorithm.as_str(), size),
                &objects,
                |b, objects| {
                    b.iter(|| {
                        let tx = m.begin_transaction().unwrap();
                        let outcome = m.validate_objects(objects, tx, Action::Write);
                        black_box(m.end_transaction(tx, outcome.allowed).unwrap())
                    });
                },
            );
        }
    }

    group.finish();
}

criterion_group!(
    benches,
    txn_lifecycle_benchmarks,
    validate_benchmarks,
    batch_benchmarks
);
criterion_main!(benches);
