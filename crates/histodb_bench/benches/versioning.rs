//! Versioned mutation benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use histodb_bench::{collection, random_text, record, records};
use histodb_core::MutationOptions;

/// Benchmark inserting new records.
fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert");

    for size in [64, 1024].iter() {
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let items = collection();
            let mut next = 0i64;

            b.iter(|| {
                let mut doc = record(next, size);
                next += 1;
                items
                    .save(black_box(&mut doc), None, &MutationOptions::default())
                    .unwrap();
            });
        });
    }
    group.finish();
}

/// Benchmark archive-then-advance on one record.
fn bench_save(c: &mut Criterion) {
    let mut group = c.benchmark_group("save");

    for size in [64, 1024].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let items = collection();
            let mut doc = record(0, size);
            items.save(&mut doc, None, &MutationOptions::default()).unwrap();
            let options = MutationOptions::new().editor("bench");

            b.iter(|| {
                doc.insert("payload", random_text(size));
                items.save(black_box(&mut doc), None, &options).unwrap();
            });
        });
    }
    group.finish();
}

/// Benchmark batched saves against originals.
fn bench_bulk_save(c: &mut Criterion) {
    let mut group = c.benchmark_group("bulk_save");

    for batch_size in [10, 100, 1000].iter() {
        group.throughput(Throughput::Elements(*batch_size as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(batch_size),
            batch_size,
            |b, &batch_size| {
                let items = collection();
                let mut current = records(batch_size, 64);
                items
                    .bulk_save_versioned(&mut current, &[], None, &MutationOptions::default())
                    .unwrap();

                b.iter(|| {
                    let mut updated = current.clone();
                    for doc in &mut updated {
                        doc.insert("payload", random_text(64));
                    }
                    items
                        .bulk_save_versioned(
                            black_box(&mut updated),
                            &current,
                            None,
                            &MutationOptions::default(),
                        )
                        .unwrap();
                    current = updated;
                });
            },
        );
    }
    group.finish();
}

/// Benchmark query-scoped updates of many records.
fn bench_update_many(c: &mut Criterion) {
    use histodb_store::{Filter, Update};

    let mut group = c.benchmark_group("update_many");

    for count in [10, 100].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            let items = collection();
            items.insert_many(records(count, 64), None).unwrap();
            let mut round = 0i64;

            b.iter(|| {
                round += 1;
                items
                    .update_many(
                        &Filter::All,
                        &Update::set("round", round),
                        None,
                        &MutationOptions::default(),
                    )
                    .unwrap();
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_insert, bench_save, bench_bulk_save, bench_update_many);
criterion_main!(benches);
