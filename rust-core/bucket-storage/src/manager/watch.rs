// SPDX-License-Identifier: PMPL-1.0-or-later
//! Watch index: change callbacks per backend, bucket and key.
//!
//! Memory only. Nothing is persisted and construction does no I/O.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;

use super::{Scope, ScopedIndex};

/// Called with `(new_value, old_value)`. A removal passes `None` as the new
/// value.
///
/// Identity is the `Arc` allocation: registering a clone of the same `Arc`
/// twice is a no-op, and `unwatch` needs a clone of the registered `Arc`.
pub type WatchCallback = Arc<dyn Fn(Option<&Value>, Option<&Value>) + Send + Sync>;

/// Wrap a closure as a [`WatchCallback`].
pub fn watcher<F>(f: F) -> WatchCallback
where
    F: Fn(Option<&Value>, Option<&Value>) + Send + Sync + 'static,
{
    Arc::new(f)
}

type KeyWatchers = HashMap<String, Vec<WatchCallback>>;

/// Registry of watch callbacks.
#[derive(Default)]
pub struct WatchManager {
    index: RwLock<ScopedIndex<KeyWatchers>>,
}

impl WatchManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exists(&self, key: &str, callback: &WatchCallback, scope: &Scope) -> bool {
        self.with_key(key, scope, |callbacks| {
            callbacks.iter().any(|cb| Arc::ptr_eq(cb, callback))
        })
    }

    /// Whether any callback is registered for `key`.
    pub fn has_watchers(&self, key: &str, scope: &Scope) -> bool {
        self.with_key(key, scope, |callbacks| !callbacks.is_empty())
    }

    /// Register `callback`. Registering the same callback twice is a no-op.
    pub fn add(&self, key: &str, callback: WatchCallback, scope: &Scope) {
        let mut index = self.index.write();
        let callbacks = index
            .bucket_or_default(scope)
            .entry(key.to_string())
            .or_default();
        if !callbacks.iter().any(|cb| Arc::ptr_eq(cb, &callback)) {
            callbacks.push(callback);
        }
    }

    /// Snapshot of the callbacks for `key`, safe to invoke without holding
    /// any lock.
    pub fn get(&self, key: &str, scope: &Scope) -> Vec<WatchCallback> {
        self.index
            .read()
            .bucket(scope)
            .and_then(|watchers| watchers.get(key))
            .cloned()
            .unwrap_or_default()
    }

    /// Deregister `callback`. No-op if it was never registered.
    pub fn remove(&self, key: &str, callback: &WatchCallback, scope: &Scope) {
        let mut index = self.index.write();
        if let Some(callbacks) = index
            .bucket_mut(scope)
            .and_then(|watchers| watchers.get_mut(key))
        {
            if let Some(position) = callbacks.iter().position(|cb| Arc::ptr_eq(cb, callback)) {
                callbacks.remove(position);
            }
        }
    }

    /// Deregister every callback for `key`.
    pub fn clear(&self, key: &str, scope: &Scope) {
        if let Some(watchers) = self.index.write().bucket_mut(scope) {
            watchers.remove(key);
        }
    }

    fn with_key(&self, key: &str, scope: &Scope, f: impl FnOnce(&[WatchCallback]) -> bool) -> bool {
        self.index
            .read()
            .bucket(scope)
            .and_then(|watchers| watchers.get(key))
            .is_some_and(|callbacks| f(callbacks))
    }
}

impl std::fmt::Debug for WatchManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchManager").finish_non_exhaustive()
    }
}
