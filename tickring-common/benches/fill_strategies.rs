//! Per-key vs per-range fills across row sequences of different run lengths,
//! plus the view and materialized paths of `get_chunk`.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use tickring_common::{
    FillStrategy, GetContext, RingStore, RowSet, WritableChunk, WraparoundChunkAccessor,
    USE_RANGES_AVERAGE_RUN_LENGTH,
};

const CAPACITY: usize = 65_536;

fn wrapped_ring() -> RingStore<f64> {
    let mut ring = RingStore::new(CAPACITY).unwrap();
    let values: Vec<f64> = (0..CAPACITY + CAPACITY / 2).map(|i| i as f64).collect();
    ring.add_slice(&values);
    ring
}

/// Runs of `run` keys separated by one-key gaps, across the whole window.
fn rows_with_run_length(ring: &RingStore<f64>, run: i64) -> RowSet {
    let window = ring.indices().unwrap();
    let mut builder = RowSet::builder();
    let mut key = window.first;
    while key + run - 1 <= window.last {
        builder.append_range(key, key + run - 1);
        key += run + 1;
    }
    builder.build()
}

fn bench_fill_strategies(c: &mut Criterion) {
    let ring = wrapped_ring();
    let accessor = WraparoundChunkAccessor::new(&ring, USE_RANGES_AVERAGE_RUN_LENGTH);
    let mut group = c.benchmark_group("fill_chunk");

    for run in [1, 2, 4, 8, 32, 256] {
        let rows = rows_with_run_length(&ring, run);
        let mut destination = WritableChunk::with_capacity(CAPACITY);
        group.throughput(Throughput::Elements(rows.ranges().iter().map(|r| r.len() as u64).sum()));

        for strategy in [FillStrategy::PerKey, FillStrategy::PerRange] {
            group.bench_with_input(
                BenchmarkId::new(format!("{strategy:?}"), run),
                &rows,
                |b, rows| {
                    b.iter(|| {
                        accessor
                            .fill_chunk_with(strategy, &mut destination, black_box(rows))
                            .unwrap();
                        black_box(destination.size())
                    })
                },
            );
        }
    }
    group.finish();
}

fn bench_get_chunk(c: &mut Criterion) {
    let ring = wrapped_ring();
    let accessor = WraparoundChunkAccessor::new(&ring, USE_RANGES_AVERAGE_RUN_LENGTH);
    let window = ring.indices().unwrap();
    let mut context = GetContext::new(CAPACITY);
    let mut group = c.benchmark_group("get_chunk");
    group.throughput(Throughput::Elements(4096));

    // slots 0..4096, no wrap
    let view_first = window.first + (CAPACITY / 2) as i64;
    group.bench_function("view", |b| {
        b.iter(|| {
            let chunk = accessor
                .get_chunk(&mut context, black_box(view_first), view_first + 4095)
                .unwrap();
            black_box(chunk.len())
        })
    });

    let wrap_first = window.first + (CAPACITY / 2) as i64 - 2048;
    group.bench_function("materialized", |b| {
        b.iter(|| {
            let chunk = accessor
                .get_chunk(&mut context, black_box(wrap_first), wrap_first + 4095)
                .unwrap();
            black_box(chunk.len())
        })
    });
    group.finish();
}

criterion_group!(benches, bench_fill_strategies, bench_get_chunk);
criterion_main!(benches);
