// SPDX-License-Identifier: PMPL-1.0-or-later
//! Bucket storage configuration.
//!
//! Defaults:
//! - encrypt: true
//! - bucket_name: `__BUCKET-STORAGE__`
//! - expire: never
//! - storage_type: session
//! - encryption key: `_BUCKET-STORAGE_` (AES-128)
//!
//! Field names deserialize in camelCase (`bucketName`, `storageType`,
//! `encryptOption`). Unknown fields such as `iv` are ignored.

use bucket_storage_backend::StorageType;
use serde::de::{Deserializer, IgnoredAny};
use serde::{Deserialize, Serialize};

use crate::envelope::Expire;
use crate::error::{BucketStorageError, Result};
use crate::{DEFAULT_BUCKET_NAME, DEFAULT_ENCRYPTION_KEY};

/// Key material for payload encryption. A missing `key` falls back to the
/// default key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncryptionOption {
    /// UTF-8 key of 16, 24 or 32 bytes.
    pub key: String,
}

impl Default for EncryptionOption {
    fn default() -> Self {
        Self {
            key: DEFAULT_ENCRYPTION_KEY.to_string(),
        }
    }
}

/// Construction options for [`crate::BucketStorage`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BucketStorageConfig {
    /// Whether values are encrypted unless a call says otherwise.
    #[serde(deserialize_with = "deserialize_flag")]
    pub encrypt: bool,
    /// Bucket used when a call names none.
    pub bucket_name: String,
    /// Expiry used when a call names none.
    pub expire: Expire,
    /// Backend used when a call names none.
    pub storage_type: StorageType,
    /// Cipher key.
    #[serde(rename = "encryptOption")]
    pub encryption: EncryptionOption,
}

impl BucketStorageConfig {
    /// Parse a JSON options object. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration can build a working store.
    pub fn validate(&self) -> Result<()> {
        let len = self.encryption.key.len();
        if !matches!(len, 16 | 24 | 32) {
            return Err(BucketStorageError::InvalidConfig(format!(
                "encryptOption.key must be 16, 24 or 32 bytes, got {len}"
            )));
        }
        Ok(())
    }

    pub fn with_bucket(mut self, bucket_name: impl Into<String>) -> Self {
        self.bucket_name = bucket_name.into();
        self
    }

    pub fn with_storage_type(mut self, storage_type: StorageType) -> Self {
        self.storage_type = storage_type;
        self
    }

    pub fn with_expire(mut self, expire: Expire) -> Self {
        self.expire = expire.normalized();
        self
    }

    pub fn with_encrypt(mut self, encrypt: bool) -> Self {
        self.encrypt = encrypt;
        self
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.encryption.key = key.into();
        self
    }
}

impl Default for BucketStorageConfig {
    fn default() -> Self {
        Self {
            encrypt: true,
            bucket_name: DEFAULT_BUCKET_NAME.to_string(),
            expire: Expire::Never,
            storage_type: StorageType::Session,
            encryption: EncryptionOption::default(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FlagRepr {
    Bool(bool),
    Text(String),
    Other(IgnoredAny),
}

/// Only `false` and `"false"` switch encryption off.
fn deserialize_flag<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<bool, D::Error> {
    Ok(match FlagRepr::deserialize(deserializer)? {
        FlagRepr::Bool(flag) => flag,
        FlagRepr::Text(text) => text != "false",
        FlagRepr::Other(_) => true,
    })
}
