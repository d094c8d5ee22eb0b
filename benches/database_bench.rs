// ABOUTME: Criterion benchmarks for message-store operations using the SQLite backend
// ABOUTME: Measures transactional inserts, read-back of recent rows and counting
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! Criterion benchmarks for the message store.
//!
//! Every insert runs in its own transaction, so these numbers bound how many
//! messages per second a single listener can archive.

#![allow(
    clippy::missing_docs_in_private_items,
    clippy::unwrap_used,
    missing_docs
)]

use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use matrix_archiver::config::PostgresPoolConfig;
use matrix_archiver::database_plugins::factory::Database;
use matrix_archiver::database_plugins::DatabaseProvider;
use matrix_archiver::models::MessageRecord;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::runtime::Runtime;

/// Monotonic offset so generated messages have increasing timestamps
static MESSAGE_COUNTER: AtomicI64 = AtomicI64::new(0);

const BODY: &str = "The quick brown fox jumps over the lazy dog, again and again.";

fn generate_message(store_content: bool) -> MessageRecord {
    let counter = MESSAGE_COUNTER.fetch_add(1, Ordering::SeqCst);
    let base = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
    MessageRecord::from_text(
        format!("!room{}:example.org", counter % 4),
        format!("@user{}:example.org", counter % 16),
        base + Duration::milliseconds(counter),
        BODY,
        store_content,
    )
}

async fn create_test_db() -> Database {
    let db = Database::new("sqlite::memory:", &PostgresPoolConfig::default())
        .await
        .unwrap();
    db.migrate().await.unwrap();
    db
}

fn bench_store_message(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("message_store");

    let db = rt.block_on(create_test_db());

    group.bench_function("single_with_content", |b| {
        b.iter(|| {
            let record = generate_message(true);
            rt.block_on(async { db.store_message(black_box(&record)).await })
        });
    });

    group.bench_function("single_metadata_only", |b| {
        b.iter(|| {
            let record = generate_message(false);
            rt.block_on(async { db.store_message(black_box(&record)).await })
        });
    });

    group.throughput(Throughput::Elements(10));
    group.bench_function("batch_10_messages", |b| {
        b.iter(|| {
            rt.block_on(async {
                for _ in 0..10 {
                    let record = generate_message(true);
                    let _ = db.store_message(&record).await;
                }
            });
        });
    });

    group.finish();
}

fn bench_recent_messages(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("message_read");

    let db = rt.block_on(create_test_db());
    rt.block_on(async {
        for _ in 0..1_000 {
            let _ = db.store_message(&generate_message(true)).await;
        }
    });

    for limit in [10_u32, 100, 500] {
        group.throughput(Throughput::Elements(u64::from(limit)));
        group.bench_with_input(BenchmarkId::new("recent", limit), &limit, |b, &limit| {
            b.iter(|| rt.block_on(async { db.recent_messages(black_box(limit)).await }));
        });
    }

    group.bench_function("count", |b| {
        b.iter(|| rt.block_on(async { db.message_count().await }));
    });

    group.finish();
}

criterion_group!(benches, bench_store_message, bench_recent_messages);
criterion_main!(benches);
