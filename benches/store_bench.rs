use std::hint::black_box;
use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use serde_json::json;

use restable::controller::ResourceTableController;
use restable::query::QueryState;
use restable::store::{PageResult, Record, RecordStore};
use restable::testutil::{MemoryCollection, MemoryRemote, fields};

const PAGE_SIZES: &[u32] = &[10, 100, 1000];

fn make_page(page_size: u32) -> PageResult {
    let records = (1..=page_size as i64)
        .map(|id| {
            Record::new(
                id,
                fields(&[
                    ("name", json!(format!("Client {id}"))),
                    ("email", json!(format!("client{id}@example.com"))),
                    ("active", json!(id % 2 == 0)),
                ]),
            )
        })
        .collect();
    PageResult {
        records,
        total: page_size as u64 * 10,
        page: 1,
        page_size,
    }
}

fn bench_store(c: &mut Criterion) {
    let mut group = c.benchmark_group("store");

    for &page_size in PAGE_SIZES {
        let page = make_page(page_size);
        group.throughput(Throughput::Elements(page_size as u64));

        group.bench_with_input(BenchmarkId::new("replace", page_size), &page, |b, page| {
            let mut store = RecordStore::new(1, page_size);
            b.iter(|| store.replace(black_box(page.clone())));
        });

        let mut store = RecordStore::new(1, page_size);
        store.replace(page.clone());
        let middle = page.records[page.records.len() / 2].clone();

        group.bench_with_input(
            BenchmarkId::new("replace_record", page_size),
            &middle,
            |b, record| {
                let mut store = store.clone();
                b.iter(|| store.replace_record(black_box(record.clone())));
            },
        );

        group.bench_with_input(
            BenchmarkId::new("insert_front", page_size),
            &store,
            |b, store| {
                let fresh = Record::new(-1, fields(&[("name", json!("Acme"))]));
                b.iter_batched(
                    || store.clone(),
                    |mut store| {
                        store.insert_front(black_box(fresh.clone()));
                        store
                    },
                    criterion::BatchSize::SmallInput,
                );
            },
        );
    }

    group.finish();
}

fn bench_controller(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("controller");

    for &page_size in PAGE_SIZES {
        let remote = Arc::new(
            MemoryRemote::new()
                .with_collection("clients", MemoryCollection::named(page_size as usize * 5)),
        );
        let controller =
            ResourceTableController::new(remote, "clients", QueryState::new(page_size));
        group.throughput(Throughput::Elements(page_size as u64));

        group.bench_function(BenchmarkId::new("refresh", page_size), |b| {
            b.to_async(&rt)
                .iter(|| async { controller.refresh().await.unwrap() });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_store, bench_controller);
criterion_main!(benches);
