// SPDX-License-Identifier: PMPL-1.0-or-later
//! The `BucketStorage` facade.
//!
//! Composes the key index, the watch index and the payload cipher over a
//! [`Storages`] registry. Every call may override the default bucket and
//! backend; `set` may also override expiry and encryption.

use std::sync::Arc;

use bucket_storage_backend::{StorageBackend, StorageType, Storages};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::cipher::AesEncryption;
use crate::clock::{Clock, SystemClock};
use crate::config::BucketStorageConfig;
use crate::envelope::{Envelope, Expire};
use crate::error::{BucketStorageError, Result};
use crate::manager::{KeyManager, Scope, WatchCallback, WatchManager};
use crate::{BUCKET_STORAGE_KEY, ENCRYPT_TEXT_SYMBOL};

/// Per-call overrides for [`BucketStorage::get`], [`BucketStorage::remove`],
/// [`BucketStorage::watch`] and [`BucketStorage::unwatch`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessOptions {
    pub bucket_name: Option<String>,
    pub storage_type: Option<StorageType>,
}

impl AccessOptions {
    pub fn bucket(mut self, bucket_name: impl Into<String>) -> Self {
        self.bucket_name = Some(bucket_name.into());
        self
    }

    pub fn storage_type(mut self, storage_type: StorageType) -> Self {
        self.storage_type = Some(storage_type);
        self
    }
}

/// Per-call overrides for [`BucketStorage::set`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// `Some(false)` stores this value in plain JSON even if the instance
    /// encrypts by default, and vice versa.
    pub encrypt: Option<bool>,
    pub bucket_name: Option<String>,
    /// `None` uses the instance default; `Some(Expire::Never)` disables
    /// expiry for this value.
    pub expire: Option<Expire>,
    pub storage_type: Option<StorageType>,
}

impl SetOptions {
    pub fn encrypt(mut self, encrypt: bool) -> Self {
        self.encrypt = Some(encrypt);
        self
    }

    pub fn bucket(mut self, bucket_name: impl Into<String>) -> Self {
        self.bucket_name = Some(bucket_name.into());
        self
    }

    pub fn expire(mut self, expire: Expire) -> Self {
        self.expire = Some(expire);
        self
    }

    pub fn storage_type(mut self, storage_type: StorageType) -> Self {
        self.storage_type = Some(storage_type);
        self
    }
}

/// Namespaced key-value store with expiry, encryption and change watches.
///
/// # Example
///
/// ```rust
/// use bucket_storage::{BucketStorage, BucketStorageConfig, SetOptions, AccessOptions, Storages};
///
/// let storage = BucketStorage::new(BucketStorageConfig::default(), Storages::in_memory()).unwrap();
/// storage.set("user", &serde_json::json!({"name": "Ada"}), SetOptions::default()).unwrap();
///
/// let user: serde_json::Value = storage.get("user", AccessOptions::default()).unwrap();
/// assert_eq!(user["name"], "Ada");
/// ```
pub struct BucketStorage {
    encrypt: bool,
    bucket_name: String,
    expire: Expire,
    storage_type: StorageType,
    encryption: AesEncryption,
    storages: Storages,
    key_manager: KeyManager,
    watch_manager: WatchManager,
    clock: Arc<dyn Clock>,
}

impl BucketStorage {
    /// Build a store over `storages`, loading every backend's key index.
    pub fn new(config: BucketStorageConfig, storages: Storages) -> Result<Self> {
        Self::with_clock(config, storages, Arc::new(SystemClock))
    }

    /// As [`BucketStorage::new`] with an explicit time source.
    pub fn with_clock(
        config: BucketStorageConfig,
        storages: Storages,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        let encryption = AesEncryption::new(&config.encryption.key)?;
        let key_manager = KeyManager::new(storages.clone());

        debug!(
            bucket = %config.bucket_name,
            storage = %config.storage_type,
            encrypt = config.encrypt,
            expire = %config.expire,
            "bucket storage ready"
        );

        Ok(Self {
            encrypt: config.encrypt,
            bucket_name: config.bucket_name,
            expire: config.expire.normalized(),
            storage_type: config.storage_type,
            encryption,
            storages,
            key_manager,
            watch_manager: WatchManager::new(),
            clock,
        })
    }

    /// Store `value` under `key`.
    ///
    /// Watchers fire with `(new, old)` only when a live value was replaced.
    ///
    /// Fails with [`BucketStorageError::ReservedKey`] when bucket and key
    /// join into the backend key that holds the key index (for example key
    /// `BUCKET_STORAGE_KEYS__` in bucket `""`).
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T, options: SetOptions) -> Result<()> {
        let scope = self.scope(options.bucket_name.as_deref(), options.storage_type);
        let physical_key = scope.physical_key(key);
        if physical_key == BUCKET_STORAGE_KEY {
            return Err(BucketStorageError::ReservedKey(physical_key));
        }
        let value = serde_json::to_value(value)?;

        let old = if self.key_manager.exists(key, &scope) {
            self.read(key, &scope)
        } else {
            None
        };

        let now = self.clock.now();
        let expire = options.expire.unwrap_or(self.expire);
        let envelope = Envelope::new(value, now, expire);
        let raw = self.seal(&serde_json::to_string(&envelope)?, options.encrypt)?;

        self.backend(scope.storage_type)
            .set_item(&physical_key, &raw)?;

        if let Some(old) = old {
            notify(
                &self.watch_manager.get(key, &scope),
                Some(&envelope.value),
                Some(&old),
            );
        }

        self.key_manager.add(key, &scope)
    }

    /// Read the value under `key`.
    ///
    /// Returns `None` when the key is absent, expired, unreadable or not a
    /// `T`. Expired values are removed on the way out.
    pub fn get<T: DeserializeOwned>(&self, key: &str, options: AccessOptions) -> Option<T> {
        let scope = self.scope(options.bucket_name.as_deref(), options.storage_type);
        let value = self.read(key, &scope)?;
        match serde_json::from_value(value) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(key, bucket = %scope.bucket, error = %err, "stored value has an unexpected shape");
                None
            }
        }
    }

    /// Whether `key` is listed in the key index. Does not check expiry.
    pub fn contains(&self, key: &str, options: AccessOptions) -> bool {
        let scope = self.scope(options.bucket_name.as_deref(), options.storage_type);
        self.key_manager.exists(key, &scope)
    }

    /// Delete `key`. Watchers fire with `(None, old)`.
    pub fn remove(&self, key: &str, options: AccessOptions) -> Result<()> {
        let scope = self.scope(options.bucket_name.as_deref(), options.storage_type);
        if !self.key_manager.exists(key, &scope) {
            return Ok(());
        }

        // Decoding is only worth it when someone is listening.
        let old = if self.watch_manager.has_watchers(key, &scope) {
            self.peek(key, &scope)
        } else {
            None
        };

        self.evict(key, &scope, old)
    }

    /// Delete every key in a bucket (the default bucket if `None`).
    ///
    /// Watchers of each deleted key fire with `(None, old)`.
    pub fn clear(&self, bucket_name: Option<&str>, storage_type: Option<StorageType>) -> Result<()> {
        let scope = self.scope(bucket_name, storage_type);
        let keys = self.key_manager.bucket_keys(&scope);
        if keys.is_empty() {
            return Ok(());
        }

        let backend = self.backend(scope.storage_type);
        let mut pending = Vec::new();
        for key in &keys {
            let watchers = self.watch_manager.get(key, &scope);
            let old = if watchers.is_empty() {
                None
            } else {
                self.peek(key, &scope)
            };
            backend.remove_item(&scope.physical_key(key))?;
            if let Some(old) = old {
                pending.push((watchers, old));
            }
        }

        self.key_manager.clear(&scope)?;
        debug!(bucket = %scope.bucket, storage = %scope.storage_type, keys = keys.len(), "cleared bucket");

        for (watchers, old) in pending {
            notify(&watchers, None, Some(&old));
        }
        Ok(())
    }

    /// Register `callback` for changes to `key`.
    pub fn watch(&self, key: &str, callback: WatchCallback, options: AccessOptions) {
        let scope = self.scope(options.bucket_name.as_deref(), options.storage_type);
        self.watch_manager.add(key, callback, &scope);
    }

    /// Deregister `callback` from `key`.
    pub fn unwatch(&self, key: &str, callback: &WatchCallback, options: AccessOptions) {
        let scope = self.scope(options.bucket_name.as_deref(), options.storage_type);
        self.watch_manager.remove(key, callback, &scope);
    }

    /// Deregister every callback on `key`.
    pub fn unwatch_all(&self, key: &str, options: AccessOptions) {
        let scope = self.scope(options.bucket_name.as_deref(), options.storage_type);
        self.watch_manager.clear(key, &scope);
    }

    /// Logical keys listed for a bucket, in insertion order.
    pub fn keys(&self, bucket_name: Option<&str>, storage_type: Option<StorageType>) -> Vec<String> {
        self.key_manager.bucket_keys(&self.scope(bucket_name, storage_type))
    }

    pub fn default_bucket(&self) -> &str {
        &self.bucket_name
    }

    pub fn default_storage_type(&self) -> StorageType {
        self.storage_type
    }

    /// The backend registry this store writes to.
    pub fn storages(&self) -> &Storages {
        &self.storages
    }

    fn scope(&self, bucket_name: Option<&str>, storage_type: Option<StorageType>) -> Scope {
        Scope::new(
            storage_type.unwrap_or(self.storage_type),
            bucket_name.unwrap_or(&self.bucket_name),
        )
    }

    fn backend(&self, storage_type: StorageType) -> &Arc<dyn StorageBackend> {
        self.storages.get(storage_type)
    }

    /// Live value under `key`, evicting it if it has expired.
    fn read(&self, key: &str, scope: &Scope) -> Option<Value> {
        if !self.key_manager.exists(key, scope) {
            return None;
        }

        let envelope = self.load(key, scope)?;
        if envelope.is_live(self.clock.now()) {
            return Some(envelope.value);
        }

        debug!(key, bucket = %scope.bucket, "evicting expired value");
        if let Err(err) = self.evict(key, scope, Some(envelope.value)) {
            warn!(key, bucket = %scope.bucket, error = %err, "failed to evict expired value");
        }
        None
    }

    /// Stored value under `key`, ignoring expiry.
    fn peek(&self, key: &str, scope: &Scope) -> Option<Value> {
        self.load(key, scope).map(|envelope| envelope.value)
    }

    fn load(&self, key: &str, scope: &Scope) -> Option<Envelope> {
        let raw = match self.backend(scope.storage_type).get_item(&scope.physical_key(key)) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                warn!(key, bucket = %scope.bucket, error = %err, "failed to read stored value");
                return None;
            }
        };

        match self.open(&raw) {
            Ok(envelope) => Some(envelope),
            Err(err) => {
                warn!(key, bucket = %scope.bucket, error = %err, "failed to decode stored value");
                None
            }
        }
    }

    /// Delete the physical entry, tell watchers about `old` if there is one,
    /// then drop the key from the index.
    fn evict(&self, key: &str, scope: &Scope, old: Option<Value>) -> Result<()> {
        self.backend(scope.storage_type)
            .remove_item(&scope.physical_key(key))?;

        if let Some(old) = old {
            notify(&self.watch_manager.get(key, scope), None, Some(&old));
        }
        self.key_manager.remove(key, scope)
    }

    fn seal(&self, json: &str, encrypt: Option<bool>) -> Result<String> {
        if encrypt.unwrap_or(self.encrypt) {
            Ok(format!("{}{}", self.encryption.encrypt(json)?, ENCRYPT_TEXT_SYMBOL))
        } else {
            Ok(json.to_string())
        }
    }

    fn open(&self, raw: &str) -> Result<Envelope> {
        let json = match raw.strip_suffix(ENCRYPT_TEXT_SYMBOL) {
            Some(ciphertext) => self.encryption.decrypt(ciphertext)?,
            None => raw.to_string(),
        };
        serde_json::from_str(&json).map_err(BucketStorageError::from)
    }
}

impl std::fmt::Debug for BucketStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BucketStorage")
            .field("bucket_name", &self.bucket_name)
            .field("storage_type", &self.storage_type)
            .field("encrypt", &self.encrypt)
            .field("expire", &self.expire)
            .field("storages", &self.storages)
            .finish_non_exhaustive()
    }
}

fn notify(watchers: &[WatchCallback], new: Option<&Value>, old: Option<&Value>) {
    for callback in watchers {
        callback(new, old);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::manager::watcher;
    use chrono::Duration;
    use parking_lot::Mutex;
    use serde_json::json;

    type Calls = Arc<Mutex<Vec<(Option<Value>, Option<Value>)>>>;

    fn store() -> BucketStorage {
        BucketStorage::new(BucketStorageConfig::default(), Storages::in_memory()).unwrap()
    }

    fn recorder() -> (WatchCallback, Calls) {
        let calls: Calls = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&calls);
        let cb = watcher(move |new, old| {
            sink.lock().push((new.cloned(), old.cloned()));
        });
        (cb, calls)
    }

    fn raw(storage: &BucketStorage, scope: &Scope, key: &str) -> Option<String> {
        storage
            .storages()
            .get(scope.storage_type)
            .get_item(&scope.physical_key(key))
            .unwrap()
    }

    #[test]
    fn test_set_get_round_trip() {
        let storage = store();
        let data = json!({"data": "data"});
        storage.set("k", &data, SetOptions::default()).unwrap();
        assert_eq!(storage.get::<Value>("k", AccessOptions::default()), Some(data));
    }

    #[test]
    fn test_defaults_encrypt_into_session_default_bucket() {
        let storage = store();
        storage.set("k", &1, SetOptions::default()).unwrap();

        let scope = Scope::new(StorageType::Session, crate::DEFAULT_BUCKET_NAME);
        let stored = raw(&storage, &scope, "k").unwrap();
        assert!(stored.ends_with(ENCRYPT_TEXT_SYMBOL));
        assert!(!stored.contains("\"value\""));
    }

    #[test]
    fn test_plain_write_is_readable_json() {
        let storage = store();
        storage
            .set("k", &"plain", SetOptions::default().encrypt(false))
            .unwrap();

        let scope = storage.scope(None, None);
        let stored = raw(&storage, &scope, "k").unwrap();
        let envelope: Envelope = serde_json::from_str(&stored).unwrap();
        assert_eq!(envelope.value, json!("plain"));
        assert_eq!(envelope.expire, None);
    }

    #[test]
    fn test_missing_key_is_none() {
        let storage = store();
        assert_eq!(storage.get::<Value>("nope", AccessOptions::default()), None);
    }

    #[test]
    fn test_wrong_type_reads_as_none() {
        let storage = store();
        storage.set("k", &"text", SetOptions::default()).unwrap();
        assert_eq!(storage.get::<u32>("k", AccessOptions::default()), None);
        assert_eq!(
            storage.get::<String>("k", AccessOptions::default()).as_deref(),
            Some("text")
        );
    }

    #[test]
    fn test_index_governs_presence() {
        let storage = store();
        let scope = storage.scope(None, None);
        // Written behind the facade's back: not in the index, so absent.
        storage
            .storages()
            .get(scope.storage_type)
            .set_item(&scope.physical_key("ghost"), r#"{"value":1,"time":0,"expire":null}"#)
            .unwrap();
        assert_eq!(storage.get::<i32>("ghost", AccessOptions::default()), None);
        assert!(!storage.contains("ghost", AccessOptions::default()));
    }

    #[test]
    fn test_expired_read_evicts_and_notifies() {
        let clock = Arc::new(ManualClock::default());
        let storage = BucketStorage::with_clock(
            BucketStorageConfig::default().with_expire(Expire::After(200)),
            Storages::in_memory(),
            clock.clone(),
        )
        .unwrap();
        let (cb, calls) = recorder();
        storage.watch("k", cb, AccessOptions::default());

        storage.set("k", &"v", SetOptions::default()).unwrap();
        clock.advance(Duration::milliseconds(100));
        assert_eq!(storage.get::<String>("k", AccessOptions::default()).as_deref(), Some("v"));

        clock.advance(Duration::milliseconds(150));
        assert_eq!(storage.get::<String>("k", AccessOptions::default()), None);

        let scope = storage.scope(None, None);
        assert!(raw(&storage, &scope, "k").is_none());
        assert!(!storage.contains("k", AccessOptions::default()));
        assert_eq!(*calls.lock(), vec![(None, Some(json!("v")))]);
    }

    #[test]
    fn test_watch_fires_on_replace_not_first_set() {
        let storage = store();
        let (cb, calls) = recorder();
        storage.watch("k", cb, AccessOptions::default());

        storage.set("k", &1, SetOptions::default()).unwrap();
        assert!(calls.lock().is_empty());

        storage.set("k", &2, SetOptions::default()).unwrap();
        storage.remove("k", AccessOptions::default()).unwrap();

        assert_eq!(
            *calls.lock(),
            vec![(Some(json!(2)), Some(json!(1))), (None, Some(json!(2)))]
        );
    }

    #[test]
    fn test_remove_absent_key_is_noop() {
        let storage = store();
        let (cb, calls) = recorder();
        storage.watch("k", cb, AccessOptions::default());
        storage.remove("k", AccessOptions::default()).unwrap();
        assert!(calls.lock().is_empty());
    }

    #[test]
    fn test_unwatch_stops_notifications() {
        let storage = store();
        let (cb, calls) = recorder();
        storage.watch("k", Arc::clone(&cb), AccessOptions::default());
        storage.unwatch("k", &cb, AccessOptions::default());

        storage.set("k", &1, SetOptions::default()).unwrap();
        storage.set("k", &2, SetOptions::default()).unwrap();
        assert!(calls.lock().is_empty());
    }

    #[test]
    fn test_clear_notifies_and_empties_bucket() {
        let storage = store();
        let (cb, calls) = recorder();
        storage.set("a", &1, SetOptions::default()).unwrap();
        storage.set("b", &2, SetOptions::default()).unwrap();
        storage.watch("a", cb, AccessOptions::default());

        storage.clear(None, None).unwrap();

        assert_eq!(storage.get::<i32>("a", AccessOptions::default()), None);
        assert_eq!(storage.get::<i32>("b", AccessOptions::default()), None);
        assert!(storage.keys(None, None).is_empty());
        assert_eq!(*calls.lock(), vec![(None, Some(json!(1)))]);
    }

    #[test]
    fn test_garbage_payload_reads_as_none() {
        let storage = store();
        storage.set("k", &1, SetOptions::default()).unwrap();
        let scope = storage.scope(None, None);
        storage
            .storages()
            .get(scope.storage_type)
            .set_item(&scope.physical_key("k"), &format!("garbage{}", ENCRYPT_TEXT_SYMBOL))
            .unwrap();

        assert_eq!(storage.get::<i32>("k", AccessOptions::default()), None);
        // Still listed: only expiry evicts on read.
        assert!(storage.contains("k", AccessOptions::default()));
    }

    #[test]
    fn test_invalid_key_is_rejected_at_construction() {
        let err = BucketStorage::new(
            BucketStorageConfig::default().with_key("short"),
            Storages::in_memory(),
        )
        .unwrap_err();
        assert!(matches!(err, BucketStorageError::InvalidConfig(_)));
    }

    #[test]
    fn test_set_over_expired_value_notifies_removal_only() {
        let clock = Arc::new(ManualClock::default());
        let storage = BucketStorage::with_clock(
            BucketStorageConfig::default().with_expire(Expire::After(100)),
            Storages::in_memory(),
            clock.clone(),
        )
        .unwrap();
        let (cb, calls) = recorder();
        storage.watch("k", cb, AccessOptions::default());

        storage.set("k", &"v1", SetOptions::default()).unwrap();
        clock.advance(Duration::milliseconds(200));
        storage.set("k", &"v2", SetOptions::default()).unwrap();

        assert_eq!(*calls.lock(), vec![(None, Some(json!("v1")))]);
        assert!(storage.contains("k", AccessOptions::default()));
        assert_eq!(
            storage.get::<String>("k", AccessOptions::default()).as_deref(),
            Some("v2")
        );
    }

    #[test]
    fn test_watcher_may_reenter_the_store() {
        let storage = Arc::new(store());
        let seen: Arc<Mutex<Vec<Value>>> = Arc::new(Mutex::new(Vec::new()));

        let inner = Arc::downgrade(&storage);
        let sink = Arc::clone(&seen);
        let cb = watcher(move |new, _old| {
            let Some(inner) = inner.upgrade() else {
                return;
            };
            let current = inner
                .get::<Value>("k", AccessOptions::default())
                .unwrap_or(Value::Null);
            inner.set("mirror", &new, SetOptions::default()).unwrap();
            sink.lock().push(current);
        });
        storage.watch("k", cb, AccessOptions::default());

        storage.set("k", &1, SetOptions::default()).unwrap();
        storage.set("k", &2, SetOptions::default()).unwrap();
        storage.remove("k", AccessOptions::default()).unwrap();

        assert_eq!(*seen.lock(), vec![json!(2), Value::Null]);
        assert_eq!(
            storage.get::<Value>("mirror", AccessOptions::default()),
            Some(Value::Null)
        );
        assert!(!storage.contains("k", AccessOptions::default()));
    }

    #[test]
    fn test_key_index_slot_cannot_be_overwritten() {
        let storage = store();
        storage.set("kept", &1, SetOptions::default().bucket("")).unwrap();

        let err = storage
            .set("BUCKET_STORAGE_KEYS__", &2, SetOptions::default().bucket(""))
            .unwrap_err();
        assert!(matches!(err, BucketStorageError::ReservedKey(ref k) if k == BUCKET_STORAGE_KEY));

        let reloaded = BucketStorage::new(BucketStorageConfig::default(), storage.storages().clone()).unwrap();
        assert_eq!(reloaded.keys(Some(""), None), vec!["kept".to_string()]);
        assert_eq!(reloaded.get::<i32>("kept", AccessOptions::default().bucket("")), Some(1));
    }
}
