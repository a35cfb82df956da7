// SPDX-License-Identifier: PMPL-1.0-or-later
//! Bucket Storage
//!
//! Namespaced key-value storage over three interchangeable backends. Keys
//! live in buckets; every value is wrapped in a timestamped envelope that
//! can carry an expiry, is optionally AES-encrypted, and can be watched for
//! changes.
//!
//! Physical layout in each backend:
//! - `{bucket}__{key}` holds the envelope, plain JSON or
//!   `base64(ciphertext)@BUCKET-STORAGE`.
//! - `__BUCKET_STORAGE_KEYS__` holds that backend's key index.

pub mod cipher;
pub mod clock;
pub mod config;
pub mod envelope;
pub mod error;
pub mod manager;
pub mod storage;

pub use bucket_storage_backend::{
    session_backend, InMemoryBackend, StorageBackend, StorageError, StorageType, Storages,
    StoragesBuilder,
};
#[cfg(feature = "redb-backend")]
pub use bucket_storage_backend::RedbBackend;

pub use cipher::AesEncryption;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{BucketStorageConfig, EncryptionOption};
pub use envelope::{Envelope, Expire};
pub use error::{BucketStorageError, Result};
pub use manager::{watcher, KeyManager, Scope, WatchCallback, WatchManager};
pub use storage::{AccessOptions, BucketStorage, SetOptions};

/// Bucket used when none is configured.
pub const DEFAULT_BUCKET_NAME: &str = "__BUCKET-STORAGE__";

/// AES-128 key used when none is configured.
pub const DEFAULT_ENCRYPTION_KEY: &str = "_BUCKET-STORAGE_";

/// Suffix marking a stored payload as ciphertext.
pub const ENCRYPT_TEXT_SYMBOL: &str = "@BUCKET-STORAGE";

/// Backend key holding the persisted key index.
pub const BUCKET_STORAGE_KEY: &str = "__BUCKET_STORAGE_KEYS__";

/// Joins bucket and key into a backend key.
pub const BUCKET_KEY_SEPARATOR: &str = "__";

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
