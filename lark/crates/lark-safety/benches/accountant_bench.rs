//! Accountant benchmarks.
//!
//! The accountant sits on the hot path of every engine operation, so
//! a charge must stay in the handful-of-nanoseconds range.
//! Run with: `cargo bench --package lark-safety`

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use lark_safety::{Accountant, SafetyFlags};

fn bench_add_steps(c: &mut Criterion) {
    let mut group = c.benchmark_group("accountant");
    group.throughput(Throughput::Elements(1));

    group.bench_function("add_steps_unmetered", |b| {
        let acct = Accountant::unlimited();
        b.iter(|| acct.add_steps(black_box(1)))
    });

    group.bench_function("add_steps_metered", |b| {
        let acct = Accountant::new(u64::MAX, u64::MAX, SafetyFlags::CPU);
        b.iter(|| acct.add_steps(black_box(1)))
    });

    group.bench_function("check_steps", |b| {
        let acct = Accountant::new(u64::MAX, u64::MAX, SafetyFlags::CPU);
        b.iter(|| acct.check_steps(black_box(1)))
    });

    group.finish();
}

fn bench_allocs(c: &mut Criterion) {
    let mut group = c.benchmark_group("accountant_allocs");
    group.throughput(Throughput::Elements(1));

    group.bench_function("charge_release_pair", |b| {
        let acct = Accountant::new(u64::MAX, u64::MAX, SafetyFlags::MEMORY);
        b.iter(|| {
            acct.add_allocs(black_box(64)).unwrap();
            acct.add_allocs(black_box(-64)).unwrap();
        })
    });

    group.finish();
}

criterion_group!(benches, bench_add_steps, bench_allocs);
criterion_main!(benches);
