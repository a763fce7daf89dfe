//! Criterion benchmarks for the topology planner.
//!
//! Run with: `cargo bench -p xover-core`
#![allow(missing_docs)]

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use xover_core::{FeatureFlags, OutputMode, plan};

fn bench_plan(c: &mut Criterion) {
    let all_flags = FeatureFlags {
        test_source: true,
        woofer_protection: true,
        loudness_compensation: true,
        ..FeatureFlags::default()
    };

    let mut group = c.benchmark_group("plan");
    for mode in OutputMode::ALL {
        group.bench_function(mode.as_str(), |b| {
            b.iter(|| plan(black_box(mode), black_box(&all_flags)));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_plan);
criterion_main!(benches);
