// SPDX-License-Identifier: PMPL-1.0-or-later
//! Per-backend, per-bucket bookkeeping shared by the key and watch indexes.

pub mod key;
pub mod watch;

use std::collections::{BTreeMap, HashMap};

use bucket_storage_backend::StorageType;

use crate::BUCKET_KEY_SEPARATOR;

pub use key::KeyManager;
pub use watch::{watcher, WatchCallback, WatchManager};

/// A resolved (backend, bucket) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Scope {
    pub storage_type: StorageType,
    pub bucket: String,
}

impl Scope {
    pub fn new(storage_type: StorageType, bucket: impl Into<String>) -> Self {
        Self {
            storage_type,
            bucket: bucket.into(),
        }
    }

    /// The backend key for `key` in this bucket: `{bucket}__{key}`.
    pub fn physical_key(&self, key: &str) -> String {
        format!("{}{}{}", self.bucket, BUCKET_KEY_SEPARATOR, key)
    }
}

/// Storage type → bucket → `T`.
#[derive(Debug)]
pub(crate) struct ScopedIndex<T> {
    backends: HashMap<StorageType, BTreeMap<String, T>>,
}

impl<T> Default for ScopedIndex<T> {
    fn default() -> Self {
        Self {
            backends: HashMap::new(),
        }
    }
}

impl<T> ScopedIndex<T> {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn bucket(&self, scope: &Scope) -> Option<&T> {
        self.backends
            .get(&scope.storage_type)
            .and_then(|buckets| buckets.get(&scope.bucket))
    }

    pub(crate) fn bucket_mut(&mut self, scope: &Scope) -> Option<&mut T> {
        self.backends
            .get_mut(&scope.storage_type)
            .and_then(|buckets| buckets.get_mut(&scope.bucket))
    }

    /// The bucket for `scope`, created empty if missing.
    pub(crate) fn bucket_or_default(&mut self, scope: &Scope) -> &mut T
    where
        T: Default,
    {
        self.backends
            .entry(scope.storage_type)
            .or_default()
            .entry(scope.bucket.clone())
            .or_default()
    }

    pub(crate) fn backend(&self, storage_type: StorageType) -> Option<&BTreeMap<String, T>> {
        self.backends.get(&storage_type)
    }

    pub(crate) fn replace_backend(&mut self, storage_type: StorageType, buckets: BTreeMap<String, T>) {
        self.backends.insert(storage_type, buckets);
    }
}
