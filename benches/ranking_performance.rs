//! Performance benchmarks for queue ranking and board building

use chrono::{Duration, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use patient_queue::queue::{InMemoryQueueStore, QueueRanker, QueueStore};
use patient_queue::types::{Priority, QueueEntry, QueueStatus, RegistrationRequest, ServicePoint};
use patient_queue::utils::format_ticket_number;

/// A busy-day snapshot spread across every service point
fn create_bench_entries(count: usize) -> Vec<QueueEntry> {
    let start = Utc::now() - Duration::hours(8);

    (0..count)
        .map(|i| {
            let service_point = ServicePoint::ALL[i % ServicePoint::ALL.len()];
            let priority = match i % 10 {
                0 => Priority::Emergency,
                1 | 2 => Priority::Urgent,
                _ => Priority::Normal,
            };
            let status = match i % 7 {
                0 => QueueStatus::Completed,
                1 => QueueStatus::Serving,
                2 => QueueStatus::Called,
                _ => QueueStatus::Waiting,
            };

            QueueEntry {
                id: format!("entry-{}", i),
                patient_id: format!("patient-{}", i % (count / 2 + 1)),
                service_point,
                ticket_number: format_ticket_number(service_point, (i / 7 + 1) as u64),
                status,
                priority,
                estimated_wait_time: ((i * 37) % 120) as u32,
                arrival_time: start + Duration::seconds(i as i64 * 10),
                start_time: None,
                end_time: None,
            }
        })
        .collect()
}

fn bench_board(c: &mut Criterion) {
    let mut group = c.benchmark_group("board");

    for size in [100, 1_000, 10_000] {
        let entries = create_bench_entries(size);

        group.bench_with_input(BenchmarkId::from_parameter(size), &entries, |b, entries| {
            b.iter(|| {
                let ranker = QueueRanker::new(black_box(entries));
                black_box(ranker.board(ServicePoint::Triage, 3))
            })
        });
    }

    group.finish();
}

fn bench_next_in_queue(c: &mut Criterion) {
    let entries = create_bench_entries(5_000);
    let ranker = QueueRanker::new(&entries);

    c.bench_function("next_in_queue_all_points", |b| {
        b.iter(|| {
            for service_point in ServicePoint::ALL {
                black_box(ranker.next_in_queue(service_point, 10));
            }
        })
    });

    c.bench_function("average_wait_time", |b| {
        b.iter(|| black_box(ranker.average_wait_time(black_box(ServicePoint::Pharmacy))))
    });
}

fn bench_patient_status(c: &mut Criterion) {
    let entries = create_bench_entries(5_000);
    let ranker = QueueRanker::new(&entries);

    c.bench_function("patient_queue_status", |b| {
        b.iter(|| black_box(ranker.patient_queue_status(black_box("patient-42"))))
    });
}

fn bench_store_snapshot(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryQueueStore::new();

    rt.block_on(async {
        for i in 0..1_000 {
            store
                .register(
                    RegistrationRequest {
                        patient_id: format!("patient-{}", i),
                        service_point: ServicePoint::ALL[i % ServicePoint::ALL.len()],
                        priority: Priority::Normal,
                        estimated_wait_time: Some(15),
                    },
                    15,
                    Utc::now(),
                )
                .await
                .unwrap();
        }
    });

    c.bench_function("store_snapshot_1000", |b| {
        b.iter(|| rt.block_on(async { black_box(store.snapshot().await.unwrap()) }))
    });
}

criterion_group!(
    benches,
    bench_board,
    bench_next_in_queue,
    bench_patient_status,
    bench_store_snapshot
);
criterion_main!(benches);
