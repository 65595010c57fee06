//! Criterion micro-benchmarks for the recycling queue.

use std::hint::black_box;
use std::sync::Arc;
use std::thread;

use criterion::{criterion_group, criterion_main, Criterion};
use strata_pool::RecyclingQueue;

/// Benchmark: Poll and put back one entry, uncontended.
fn bench_poll_put(c: &mut Criterion) {
    let queue = RecyclingQueue::new();
    for i in 0..16u64 {
        queue.put_entry(queue.allocate_entry(i)).unwrap();
    }
    c.bench_function("queue_poll_put", |b| {
        b.iter(|| {
            let entry = queue.poll_entry().unwrap();
            black_box(*entry.get());
            queue.put_entry(entry).unwrap();
        });
    });
}

/// Benchmark: 4 threads each cycling 1K entries through one queue.
fn bench_contended(c: &mut Criterion) {
    let queue = Arc::new(RecyclingQueue::new());
    for i in 0..64u64 {
        queue.put_entry(queue.allocate_entry(i)).unwrap();
    }
    c.bench_function("queue_contended_4x1k", |b| {
        b.iter(|| {
            thread::scope(|s| {
                for _ in 0..4 {
                    let queue = Arc::clone(&queue);
                    s.spawn(move || {
                        for _ in 0..1_000 {
                            if let Some(entry) = queue.poll_entry() {
                                black_box(*entry.get());
                                queue.put_entry(entry).unwrap();
                            }
                        }
                    });
                }
            });
        });
    });
}

criterion_group!(benches, bench_poll_put, bench_contended);
criterion_main!(benches);
