// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory storage backend for bucket-storage.
//
// Uses a `BTreeMap` wrapped in a `parking_lot::RwLock` for thread-safe,
// ordered key-value storage. The ordering gives `key(index)` a stable
// meaning. Serves as the volatile `memory` store, as the process-wide
// `session` store, and as the fallback for hosts without durable storage.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::backend::StorageBackend;
use crate::error::StorageError;

/// An in-memory storage backend backed by a sorted `BTreeMap`.
///
/// All data lives in process memory and is lost when the last clone is
/// dropped. Clones share the same map, so handing a clone to several
/// registries makes them observe each other's writes.
///
/// # Example
///
/// ```rust
/// use bucket_storage_backend::memory::InMemoryBackend;
/// use bucket_storage_backend::backend::StorageBackend;
///
/// let store = InMemoryBackend::new();
/// store.set_item("hello", "world").unwrap();
/// assert_eq!(store.get_item("hello").unwrap(), Some("world".to_string()));
/// ```
#[derive(Debug, Clone)]
pub struct InMemoryBackend {
    /// The underlying sorted map, protected by a read-write lock.
    data: Arc<RwLock<BTreeMap<String, String>>>,
    /// Name reported through [`StorageBackend::name`].
    label: &'static str,
}

impl InMemoryBackend {
    /// Create a new, empty in-memory backend.
    pub fn new() -> Self {
        Self::with_label("in-memory")
    }

    /// Create a new, empty backend that reports `label` as its name.
    pub fn with_label(label: &'static str) -> Self {
        Self {
            data: Arc::new(RwLock::new(BTreeMap::new())),
            label,
        }
    }

    /// Return a copy of every stored pair, in key order.
    pub fn snapshot(&self) -> Vec<(String, String)> {
        self.data
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageBackend for InMemoryBackend {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.data.read().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.data.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.data.write().remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.data.write().clear();
        Ok(())
    }

    fn len(&self) -> Result<usize, StorageError> {
        Ok(self.data.read().len())
    }

    fn key(&self, index: usize) -> Result<Option<String>, StorageError> {
        Ok(self.data.read().keys().nth(index).cloned())
    }

    fn name(&self) -> &str {
        self.label
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_crud() {
        let backend = InMemoryBackend::new();

        // Initially empty.
        assert!(backend.is_empty().unwrap());
        assert_eq!(backend.get_item("key1").unwrap(), None);

        // Set and get.
        backend.set_item("key1", "value1").unwrap();
        assert_eq!(backend.get_item("key1").unwrap(), Some("value1".to_string()));
        assert_eq!(backend.len().unwrap(), 1);

        // Overwrite.
        backend.set_item("key1", "updated").unwrap();
        assert_eq!(backend.get_item("key1").unwrap(), Some("updated".to_string()));
        assert_eq!(backend.len().unwrap(), 1);

        // Remove existing key.
        backend.remove_item("key1").unwrap();
        assert_eq!(backend.get_item("key1").unwrap(), None);
        assert!(backend.is_empty().unwrap());

        // Removing a missing key is fine.
        backend.remove_item("nonexistent").unwrap();
    }

    #[test]
    fn test_key_by_index_follows_key_order() {
        let backend = InMemoryBackend::new();
        backend.set_item("b", "2").unwrap();
        backend.set_item("a", "1").unwrap();
        backend.set_item("c", "3").unwrap();

        assert_eq!(backend.key(0).unwrap().as_deref(), Some("a"));
        assert_eq!(backend.key(1).unwrap().as_deref(), Some("b"));
        assert_eq!(backend.key(2).unwrap().as_deref(), Some("c"));
        assert_eq!(backend.key(3).unwrap(), None);
    }

    #[test]
    fn test_clear() {
        let backend = InMemoryBackend::new();
        backend.set_item("a", "1").unwrap();
        backend.set_item("b", "2").unwrap();

        backend.clear().unwrap();
        assert_eq!(backend.len().unwrap(), 0);
        assert_eq!(backend.get_item("a").unwrap(), None);
    }

    #[test]
    fn test_clones_share_data() {
        let backend = InMemoryBackend::new();
        let other = backend.clone();

        backend.set_item("shared", "yes").unwrap();
        assert_eq!(other.get_item("shared").unwrap(), Some("yes".to_string()));
        assert_eq!(other.snapshot(), vec![("shared".to_string(), "yes".to_string())]);
    }

    #[test]
    fn test_name() {
        assert_eq!(InMemoryBackend::new().name(), "in-memory");
        assert_eq!(InMemoryBackend::with_label("session").name(), "session");
    }
}
