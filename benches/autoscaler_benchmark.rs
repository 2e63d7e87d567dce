//! Benchmarks for the autoscaling decision hot path.
//!
//! Run with: cargo bench

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use replica_autoscaler::{
    AutoscalerBuilder, RequestRateAutoscaler, ReplicaInfo, ReplicaStatus, ScalingEngine, ServiceSpec,
};
use std::hint::black_box;
use tokio::runtime::Runtime;

fn replica_set(n: u64) -> Vec<ReplicaInfo> {
    (0..n)
        .map(|i| ReplicaInfo::new(i, ReplicaStatus::Ready).with_alive(true))
        .collect()
}

fn bench_threshold_evaluate(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let spec = ServiceSpec::fixed(10)
        .with_bounds(1, 100)
        .with_thresholds(Some(5.0), Some(1.0));
    let autoscaler = RequestRateAutoscaler::new(&spec, 0, 60);

    let mut group = c.benchmark_group("threshold_evaluate");
    for size in [1usize, 10, 100].iter() {
        let infos = replica_set(*size as u64);
        group.bench_with_input(BenchmarkId::new("replicas", size), size, |b, _| {
            b.iter(|| {
                rt.block_on(async { black_box(autoscaler.evaluate(&infos, 1_000_000.0).await) })
            })
        });
    }
    group.finish();
}

fn bench_builder_construction(c: &mut Criterion) {
    c.bench_function("builder_build_threshold", |b| {
        b.iter(|| {
            let spec = ServiceSpec::fixed(3)
                .with_bounds(1, 10)
                .with_thresholds(Some(5.0), Some(1.0));
            black_box(AutoscalerBuilder::new(spec).build())
        })
    });
}

fn bench_scale_down_priority_ordering(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let spec = ServiceSpec::fixed(1)
        .with_bounds(1, 200)
        .with_thresholds(Some(100.0), Some(1.0));
    let autoscaler = RequestRateAutoscaler::new(&spec, 0, 60);

    let mut group = c.benchmark_group("scale_down_ordering");
    for size in [10usize, 100, 500].iter() {
        let mut infos: Vec<ReplicaInfo> = replica_set(*size as u64);
        // Sprinkle in FAILED replicas to exercise the priority-ordering pass.
        for (i, info) in infos.iter_mut().enumerate() {
            if i % 7 == 0 {
                info.status = ReplicaStatus::Failed;
                info.is_alive = false;
            }
        }
        group.bench_with_input(BenchmarkId::new("replicas", size), size, |b, _| {
            b.iter(|| {
                rt.block_on(async { black_box(autoscaler.evaluate(&infos, 0.0).await) })
            })
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_threshold_evaluate,
    bench_builder_construction,
    bench_scale_down_priority_ordering,
);
criterion_main!(benches);
