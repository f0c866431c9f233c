use clusterwatch_core::{ClusterMonitor, HistoryEntry, PollingService};
use clusterwatch_core::{FetchError, Fetcher};
use clusterwatch_types::{ClusterMetrics, Credentials, Registration};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;
use std::thread;

fn monitor() -> Arc<ClusterMonitor> {
    Arc::new(ClusterMonitor::new(
        Registration::new("bench", "bench", "creds"),
        100,
    ))
}

/// Benchmark appends to one monitor from many threads (high contention)
fn bench_concurrent_records_same_monitor(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent_records_same_monitor");

    for thread_count in [1, 2, 4, 8].iter() {
        group.throughput(Throughput::Elements(*thread_count as u64 * 1000));
        group.bench_with_input(
            BenchmarkId::new("threads", thread_count),
            thread_count,
            |b, &thread_count| {
                b.iter(|| {
                    let m = monitor();
                    let mut handles_vec = vec![];

                    for t in 0..thread_count {
                        let m = Arc::clone(&m);
                        handles_vec.push(thread::spawn(move || {
                            for i in 0..1000u64 {
                                m.record(black_box(HistoryEntry::new(
                                    t * 1000 + i,
                                    ClusterMetrics::default(),
                                )));
                            }
                        }));
                    }

                    for join_handle in handles_vec {
                        join_handle.join().unwrap();
                    }
                });
            },
        );
    }
    group.finish();
}

/// Benchmark readers copying history while one writer appends
fn bench_readers_with_writer(c: &mut Criterion) {
    let mut group = c.benchmark_group("readers_with_writer");

    for reader_count in [2, 4, 8].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(reader_count),
            reader_count,
            |b, &reader_count| {
                b.iter(|| {
                    let m = monitor();
                    let mut handles_vec = vec![];

                    let writer = Arc::clone(&m);
                    handles_vec.push(thread::spawn(move || {
                        for ts in 0..500 {
                            writer.record(HistoryEntry::new(ts, ClusterMetrics::default()));
                        }
                    }));

                    for _ in 0..reader_count {
                        let reader = Arc::clone(&m);
                        handles_vec.push(thread::spawn(move || {
                            for _ in 0..100 {
                                black_box(reader.snapshot_history());
                                black_box(reader.latest());
                            }
                        }));
                    }

                    for join_handle in handles_vec {
                        join_handle.join().unwrap();
                    }
                });
            },
        );
    }
    group.finish();
}

struct InstantFetcher;

#[async_trait::async_trait]
impl Fetcher for InstantFetcher {
    async fn fetch(&self, _credentials: &Credentials) -> Result<ClusterMetrics, FetchError> {
        Ok(ClusterMetrics::default())
    }
}

/// Benchmark one full refresh cycle across many targets
fn bench_refresh_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("refresh_cycle");
    let runtime = tokio::runtime::Runtime::new().unwrap();

    for target_count in [10, 100, 500].iter() {
        let service = PollingService::builder(InstantFetcher)
            .max_concurrent_fetches(64)
            .build();
        for i in 0..*target_count {
            service.add_target(Registration::new(format!("cluster-{}", i), "bench", "creds"));
        }

        group.throughput(Throughput::Elements(*target_count as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(target_count),
            target_count,
            |b, _| {
                b.iter(|| black_box(runtime.block_on(service.refresh_once())));
            },
        );
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_concurrent_records_same_monitor,
    bench_readers_with_writer,
    bench_refresh_cycle
);
criterion_main!(benches);
