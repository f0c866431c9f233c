use clusterwatch_core::{ClusterMonitor, FetchFailure, HistoryEntry};
use clusterwatch_types::{ClusterMetrics, PodPhase, Registration};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn sample_metrics() -> ClusterMetrics {
    let mut builder = ClusterMetrics::builder();
    for i in 0..5 {
        builder = builder.node(format!("worker-{}", i), |n| {
            n.ready(true).capacity("4", "16Gi").usage("1200m", "6Gi")
        });
    }
    for i in 0..50 {
        builder = builder.pod(format!("ns-{}", i % 5), PodPhase::Running);
    }
    builder.service("ClusterIP").namespaces(5).build()
}

fn monitor(capacity: usize) -> ClusterMonitor {
    ClusterMonitor::new(Registration::new("bench", "bench", "creds"), capacity)
}

/// Append into a full buffer, so every record also evicts
fn bench_record(c: &mut Criterion) {
    let m = monitor(100);
    let metrics = sample_metrics();
    for ts in 0..100 {
        m.record(HistoryEntry::new(ts, metrics.clone()));
    }

    c.bench_function("record_full_buffer", |b| {
        let mut ts = 100;
        b.iter(|| {
            ts += 1;
            m.record(black_box(HistoryEntry::new(ts, metrics.clone())));
        });
    });
}

fn bench_record_failure(c: &mut Criterion) {
    let m = monitor(100);

    c.bench_function("record_failure", |b| {
        b.iter(|| {
            m.record_failure(black_box(FetchFailure::new(1, "connection refused")));
        });
    });
}

fn bench_latest(c: &mut Criterion) {
    let m = monitor(100);
    let metrics = sample_metrics();
    for ts in 0..100 {
        m.record(HistoryEntry::new(ts, metrics.clone()));
    }

    c.bench_function("latest", |b| {
        b.iter(|| black_box(m.latest()));
    });
}

/// Copy cost grows with the retained depth
fn bench_snapshot_history(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot_history");
    let metrics = sample_metrics();

    for depth in [10usize, 100, 500].iter() {
        let m = monitor(*depth);
        for ts in 0..*depth as u64 {
            m.record(HistoryEntry::new(ts, metrics.clone()));
        }

        group.bench_with_input(BenchmarkId::from_parameter(depth), depth, |b, _| {
            b.iter(|| black_box(m.snapshot_history()));
        });
    }
    group.finish();
}

fn bench_status(c: &mut Criterion) {
    let m = monitor(100);
    m.record(HistoryEntry::new(1, sample_metrics()));
    m.record_failure(FetchFailure::new(2, "timeout"));

    c.bench_function("status", |b| {
        b.iter(|| black_box(m.status()));
    });
}

criterion_group!(
    benches,
    bench_record,
    bench_record_failure,
    bench_latest,
    bench_snapshot_history,
    bench_status
);
criterion_main!(benches);
