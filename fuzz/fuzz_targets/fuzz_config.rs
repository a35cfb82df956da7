// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Fuzz target for options parsing.
// Run with: cargo +nightly fuzz run fuzz_config

#![no_main]

use bucket_storage::{BucketStorage, BucketStorageConfig, Storages};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        if let Ok(config) = BucketStorageConfig::from_json_str(input) {
            // A config that validates must build a store.
            assert!(BucketStorage::new(config, Storages::in_memory()).is_ok());
        }
    }
});
