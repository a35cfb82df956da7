// SPDX-License-Identifier: PMPL-1.0-or-later
//! Performance benchmarks for bucket storage

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::{json, Value};

use bucket_storage::{
    AccessOptions, AesEncryption, BucketStorage, BucketStorageConfig, SetOptions, StorageType,
    Storages, DEFAULT_ENCRYPTION_KEY,
};

fn payload(fields: usize) -> Value {
    let map: serde_json::Map<String, Value> = (0..fields)
        .map(|i| (format!("field-{}", i), json!({"id": i, "name": format!("entry {}", i)})))
        .collect();
    Value::Object(map)
}

fn memory_store(encrypt: bool) -> BucketStorage {
    let config = BucketStorageConfig::default()
        .with_storage_type(StorageType::Memory)
        .with_encrypt(encrypt);
    BucketStorage::new(config, Storages::in_memory()).unwrap()
}

// ============================================================================
// Facade Benchmarks
// ============================================================================

fn bench_set(c: &mut Criterion) {
    let mut group = c.benchmark_group("set");

    for encrypt in [false, true] {
        let storage = memory_store(encrypt);
        let value = payload(16);
        let label = if encrypt { "encrypted" } else { "plain" };

        group.bench_function(BenchmarkId::new("overwrite", label), |b| {
            b.iter(|| storage.set(black_box("bench-key"), &value, SetOptions::default()).unwrap());
        });
    }

    group.finish();
}

fn bench_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("get");

    for encrypt in [false, true] {
        let storage = memory_store(encrypt);
        storage.set("bench-key", &payload(16), SetOptions::default()).unwrap();
        let label = if encrypt { "encrypted" } else { "plain" };

        group.bench_function(BenchmarkId::new("hit", label), |b| {
            b.iter(|| black_box(storage.get::<Value>("bench-key", AccessOptions::default())));
        });
    }

    group.finish();
}

fn bench_key_index(c: &mut Criterion) {
    let mut group = c.benchmark_group("key_index");

    for size in [10, 100, 1000] {
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("fill_and_clear", size), &size, |b, &size| {
            b.iter(|| {
                let storage = memory_store(false);
                for i in 0..size {
                    storage.set(&format!("key-{}", i), &i, SetOptions::default()).unwrap();
                }
                storage.clear(None, None).unwrap();
            });
        });
    }

    group.finish();
}

fn bench_local_redb(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let storages = Storages::open(dir.path().join("bench.redb")).unwrap();
    let config = BucketStorageConfig::default().with_storage_type(StorageType::Local);
    let storage = BucketStorage::new(config, storages).unwrap();
    let value = payload(16);

    let mut group = c.benchmark_group("redb");
    group.sample_size(20);

    group.bench_function("set", |b| {
        b.iter(|| storage.set(black_box("bench-key"), &value, SetOptions::default()).unwrap());
    });
    group.bench_function("get", |b| {
        b.iter(|| black_box(storage.get::<Value>("bench-key", AccessOptions::default())));
    });

    group.finish();
}

// ============================================================================
// Cipher Benchmarks
// ============================================================================

fn bench_cipher(c: &mut Criterion) {
    let cipher = AesEncryption::new(DEFAULT_ENCRYPTION_KEY).unwrap();
    let mut group = c.benchmark_group("cipher");

    for fields in [1, 16, 256] {
        let text = payload(fields).to_string();
        let sealed = cipher.encrypt(&text).unwrap();
        group.throughput(Throughput::Bytes(text.len() as u64));

        group.bench_with_input(BenchmarkId::new("encrypt", fields), &text, |b, text| {
            b.iter(|| black_box(cipher.encrypt(text).unwrap()));
        });
        group.bench_with_input(BenchmarkId::new("decrypt", fields), &sealed, |b, sealed| {
            b.iter(|| black_box(cipher.decrypt(sealed).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_set,
    bench_get,
    bench_key_index,
    bench_local_redb,
    bench_cipher,
);

criterion_main!(benches);
