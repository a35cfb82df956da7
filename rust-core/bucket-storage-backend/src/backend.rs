// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core storage backend trait for bucket-storage.
//
// Defines the `StorageBackend` trait that every primitive adapter satisfies.
// The shape mirrors the Web Storage contract (`getItem`, `setItem`,
// `removeItem`, `clear`, `length`, `key(n)`) so durable, session and
// in-memory stores are interchangeable underneath the bucket layer.
// Calls are synchronous and complete before returning.

use crate::error::StorageError;

/// A synchronous string key-value storage backend.
///
/// Keys and values are UTF-8 strings. Namespacing, expiry and encryption are
/// layered on top by the `bucket-storage` crate; a backend only stores what
/// it is given.
///
/// Implementations must be safe to share across threads.
pub trait StorageBackend: Send + Sync {
    /// Retrieve the value stored under `key`.
    ///
    /// Returns `Ok(None)` if the key does not exist, rather than an error.
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, overwriting any previous value.
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete the value stored under `key`. Missing keys are not an error.
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;

    /// Remove every key from the backend.
    fn clear(&self) -> Result<(), StorageError>;

    /// Number of keys currently stored.
    fn len(&self) -> Result<usize, StorageError>;

    /// Return true if the backend holds no keys.
    fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.len()? == 0)
    }

    /// The key at position `index` in the backend's iteration order, or
    /// `None` when `index` is out of range.
    fn key(&self, index: usize) -> Result<Option<String>, StorageError>;

    /// A human-readable name for this backend, used in logging.
    fn name(&self) -> &str;
}
