//! Benchmark for folding a LeanMap.
//!
//! Compares sequential iteration, `reduce`, and `fold` on the sequential and
//! scoped-thread schedulers (plus `par_fold` with the `rayon` feature).

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use leanmap::{LeanMap, ScopedThreads, Sequential};
use std::hint::black_box;
use std::ops::ControlFlow;

/// Stand-in for per-entry work heavy enough to make splitting worthwhile.
fn expensive(value: u64) -> u64 {
    (0..32).fold(value, |accumulator, round| {
        accumulator.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(round)
    })
}

fn benchmark_fold(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("fold");

    for size in [10_000, 100_000] {
        let map: LeanMap<u64, u64> = (0..size).map(|key| (key, key)).collect();

        group.bench_with_input(BenchmarkId::new("iter", size), &size, |bencher, _| {
            bencher.iter(|| {
                black_box(
                    map.iter()
                        .fold(0_u64, |sum, (_, value)| sum.wrapping_add(expensive(*value))),
                )
            });
        });

        group.bench_with_input(BenchmarkId::new("reduce", size), &size, |bencher, _| {
            bencher.iter(|| {
                black_box(map.reduce(0_u64, |sum, _, value| {
                    ControlFlow::Continue(sum.wrapping_add(expensive(*value)))
                }))
            });
        });

        group.bench_with_input(BenchmarkId::new("Sequential", size), &size, |bencher, _| {
            bencher.iter(|| {
                black_box(map.fold(
                    || 0_u64,
                    u64::wrapping_add,
                    |sum, _, value| sum.wrapping_add(expensive(*value)),
                    &Sequential,
                ))
            });
        });

        group.bench_with_input(BenchmarkId::new("ScopedThreads", size), &size, |bencher, _| {
            bencher.iter(|| {
                std::thread::scope(|scope| {
                    black_box(map.fold(
                        || 0_u64,
                        u64::wrapping_add,
                        |sum, _, value| sum.wrapping_add(expensive(*value)),
                        &ScopedThreads::new(scope),
                    ))
                })
            });
        });

        #[cfg(feature = "rayon")]
        group.bench_with_input(BenchmarkId::new("par_fold", size), &size, |bencher, _| {
            bencher.iter(|| {
                black_box(map.par_fold(
                    || 0_u64,
                    u64::wrapping_add,
                    |sum, _, value| sum.wrapping_add(expensive(*value)),
                ))
            });
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_fold);
criterion_main!(benches);
