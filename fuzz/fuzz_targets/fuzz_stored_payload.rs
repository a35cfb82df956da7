// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Fuzz target for reading stored values and key index blobs.
// Run with: cargo +nightly fuzz run fuzz_stored_payload
//
// Whatever a backend holds, reads must degrade to "not found" and
// construction must fall back to an empty index. Neither may panic.

#![no_main]

use bucket_storage::{
    AccessOptions, BucketStorage, BucketStorageConfig, SetOptions, StorageType, Storages,
    BUCKET_STORAGE_KEY,
};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    if input.len() > 4096 {
        return;
    }

    let storages = Storages::in_memory();
    let session = storages.get(StorageType::Session);
    let _ = session.set_item(BUCKET_STORAGE_KEY, input);

    let Ok(storage) = BucketStorage::new(BucketStorageConfig::default(), storages.clone()) else {
        return;
    };
    if storage.set("k", &0, SetOptions::default()).is_err() {
        return;
    }

    let physical = format!("{}__k", storage.default_bucket());
    let _ = session.set_item(&physical, input);
    let _ = storage.get::<i64>("k", AccessOptions::default());
    let _ = storage.remove("k", AccessOptions::default());
});
