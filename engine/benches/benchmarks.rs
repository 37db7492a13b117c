//! Performance benchmarks for medals-engine

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use medals_engine::{aggregate, reconcile, CounterKinds, Entity, EntityStore, RemoteEvent};

fn create_test_store(size: usize) -> EntityStore {
    let entities = (0..size)
        .map(|i| {
            let n = i as i64;
            Entity::settled(n + 1, format!("country_{}", i), [
                ("gold", n % 7),
                ("silver", n % 5),
                ("bronze", n % 3),
            ])
        })
        .collect();
    EntityStore::from_entities(entities, &CounterKinds::default()).unwrap()
}

fn bench_remote_events(c: &mut Criterion) {
    let mut group = c.benchmark_group("remote_events");

    for size in [10, 100, 250] {
        let store = create_test_store(size);
        let last = size as i64;

        group.bench_with_input(BenchmarkId::new("patch", size), &size, |b, _| {
            b.iter(|| {
                let patch = Entity::settled(last, "country", [
                    ("gold", 1),
                    ("silver", 1),
                    ("bronze", 1),
                ]);
                reconcile::apply_remote(black_box(&store), RemoteEvent::Patch(patch))
            })
        });

        group.bench_with_input(BenchmarkId::new("delete_absent", size), &size, |b, _| {
            b.iter(|| reconcile::apply_remote_delete(black_box(&store), black_box(-1)))
        });
    }

    group.finish();
}

fn bench_local_actions(c: &mut Criterion) {
    let mut group = c.benchmark_group("local_actions");
    let store = create_test_store(100);

    group.bench_function("increment", |b| {
        b.iter(|| reconcile::apply_local_delta(black_box(&store), 50, "gold", 1))
    });

    let dirty = reconcile::apply_local_delta(&store, 50, "gold", 1).unwrap();
    group.bench_function("save_diff", |b| {
        b.iter(|| reconcile::compute_save_diff(black_box(&dirty), 50))
    });

    group.finish();
}

fn bench_aggregate(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregate");

    for size in [10, 100, 1000] {
        let store = create_test_store(size);
        group.bench_with_input(BenchmarkId::new("total", size), &store, |b, store| {
            b.iter(|| aggregate::total(black_box(store)))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_remote_events,
    bench_local_actions,
    bench_aggregate
);
criterion_main!(benches);
