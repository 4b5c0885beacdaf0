//! Data store dispatch throughput.
//!
//! Measures how fast frames are classified and applied:
//! - `player_update` shallow merges
//! - log appends into a full ring buffer
//! - raw frame classification
//!
//! Run with: cargo bench --bench store_dispatch
//! Results saved to: target/criterion/

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use maicraft_link::Endpoint;
use maicraft_link::mock::generators;
use maicraft_link::protocol::parse_frame;
use maicraft_link::store::{DataStore, LOG_CAPACITY};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde_json::Value;
use std::hint::black_box;

// ============================================================================
// Benchmark Parameters
// ============================================================================

const BATCH_SIZES: &[usize] = &[100, 1000];

fn frames(count: usize, make: impl Fn(&mut StdRng) -> Value) -> Vec<Value> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..count).map(|_| make(&mut rng)).collect()
}

// ============================================================================
// Benchmark: Snapshot Merge
// ============================================================================

fn bench_player_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("player_merge");

    for &size in BATCH_SIZES {
        let batch = frames(size, |rng| generators::player_frame(rng));
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &batch, |b, batch| {
            let store = DataStore::new();
            b.iter(|| {
                for frame in batch {
                    black_box(store.update_endpoint_data(Endpoint::Player, frame));
                }
            });
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Log Append
// ============================================================================

fn bench_log_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("log_append");

    for &size in BATCH_SIZES {
        let batch = frames(size, |rng| generators::log_entry(rng, false));

        // Start at capacity so every append evicts.
        let store = DataStore::new();
        for frame in frames(LOG_CAPACITY, |rng| generators::log_entry(rng, false)) {
            store.update_endpoint_data(Endpoint::Logs, &frame);
        }

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &batch, |b, batch| {
            b.iter(|| {
                for frame in batch {
                    black_box(store.update_endpoint_data(Endpoint::Logs, frame));
                }
            });
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Classification
// ============================================================================

fn bench_parse_frame(c: &mut Criterion) {
    let mut batch = frames(250, |rng| generators::world_frame(rng));
    batch.extend(frames(250, |rng| generators::log_entry(rng, true)));
    batch.extend(frames(250, |rng| generators::tasks_frame(rng)));
    batch.extend(frames(250, |rng| generators::token_usage_frame(rng)));

    let mut group = c.benchmark_group("parse_frame");
    group.throughput(Throughput::Elements(batch.len() as u64));
    group.bench_function("mixed", |b| {
        b.iter(|| {
            for frame in &batch {
                black_box(parse_frame(frame));
            }
        });
    });
    group.finish();
}

criterion_group!(benches, bench_player_merge, bench_log_append, bench_parse_frame);
criterion_main!(benches);
