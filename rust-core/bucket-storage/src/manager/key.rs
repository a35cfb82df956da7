// SPDX-License-Identifier: PMPL-1.0-or-later
//! Key index: which logical keys are live in each bucket.
//!
//! A key is present only if it is listed here, whatever the backend holds.
//! Each backend's index is stored in that backend under
//! `__BUCKET_STORAGE_KEYS__` as `base64(JSON({bucket: [keys]}))` and is
//! rewritten after every mutation.

use std::collections::BTreeMap;

use bucket_storage_backend::{StorageType, Storages};
use parking_lot::RwLock;
use tracing::{debug, warn};

use super::{Scope, ScopedIndex};
use crate::cipher::{decode_base64, encode_base64};
use crate::error::Result;
use crate::BUCKET_STORAGE_KEY;

type BucketKeys = Vec<String>;

/// Tracks the logical keys stored per backend and bucket.
pub struct KeyManager {
    storages: Storages,
    index: RwLock<ScopedIndex<BucketKeys>>,
}

impl KeyManager {
    /// Load the persisted index of every backend in `storages`.
    ///
    /// A backend whose blob cannot be read or decoded starts with an empty
    /// index; the failure is logged and construction carries on.
    pub fn new(storages: Storages) -> Self {
        let mut index = ScopedIndex::new();
        for storage_type in StorageType::ALL {
            if let Some(buckets) = load(&storages, storage_type) {
                index.replace_backend(storage_type, buckets);
            }
        }
        Self {
            storages,
            index: RwLock::new(index),
        }
    }

    pub fn exists(&self, key: &str, scope: &Scope) -> bool {
        self.index
            .read()
            .bucket(scope)
            .is_some_and(|keys| keys.iter().any(|k| k == key))
    }

    /// Record `key` as live. No-op if it already is.
    pub fn add(&self, key: &str, scope: &Scope) -> Result<()> {
        let mut index = self.index.write();
        let keys = index.bucket_or_default(scope);
        if keys.iter().any(|k| k == key) {
            return Ok(());
        }
        keys.push(key.to_string());
        self.persist(&index, scope.storage_type)
    }

    /// Forget `key`. No-op if it is not listed.
    pub fn remove(&self, key: &str, scope: &Scope) -> Result<()> {
        let mut index = self.index.write();
        let Some(keys) = index.bucket_mut(scope) else {
            return Ok(());
        };
        let Some(position) = keys.iter().position(|k| k == key) else {
            return Ok(());
        };
        keys.remove(position);
        self.persist(&index, scope.storage_type)
    }

    /// Forget every key in the bucket. No-op if it is already empty.
    pub fn clear(&self, scope: &Scope) -> Result<()> {
        let mut index = self.index.write();
        match index.bucket_mut(scope) {
            Some(keys) if !keys.is_empty() => keys.clear(),
            _ => return Ok(()),
        }
        self.persist(&index, scope.storage_type)
    }

    /// The keys listed for the bucket, in insertion order.
    pub fn bucket_keys(&self, scope: &Scope) -> Vec<String> {
        self.index.read().bucket(scope).cloned().unwrap_or_default()
    }

    fn persist(&self, index: &ScopedIndex<BucketKeys>, storage_type: StorageType) -> Result<()> {
        let Some(buckets) = index.backend(storage_type) else {
            return Ok(());
        };
        let blob = encode_base64(&serde_json::to_string(buckets)?);
        self.storages
            .get(storage_type)
            .set_item(BUCKET_STORAGE_KEY, &blob)?;
        debug!(storage = %storage_type, buckets = buckets.len(), "persisted key index");
        Ok(())
    }
}

fn load(storages: &Storages, storage_type: StorageType) -> Option<BTreeMap<String, BucketKeys>> {
    let blob = match storages.get(storage_type).get_item(BUCKET_STORAGE_KEY) {
        Ok(Some(blob)) if !blob.is_empty() => blob,
        Ok(_) => return None,
        Err(err) => {
            warn!(storage = %storage_type, error = %err, "failed to read key index");
            return None;
        }
    };

    let parsed = decode_base64(&blob)
        .and_then(|json| serde_json::from_str::<BTreeMap<String, BucketKeys>>(&json).map_err(Into::into));
    match parsed {
        Ok(buckets) => {
            debug!(storage = %storage_type, buckets = buckets.len(), "loaded key index");
            Some(buckets)
        }
        Err(err) => {
            warn!(storage = %storage_type, error = %err, "discarding unreadable key index");
            None
        }
    }
}
