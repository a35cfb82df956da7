// SPDX-License-Identifier: PMPL-1.0-or-later
//! Error types for bucket storage operations.
//!
//! Reads never surface these: a value that cannot be decrypted or parsed is
//! logged and treated as missing. Writes (`set`, `remove`, `clear`) and
//! construction return them.

use bucket_storage_backend::StorageError;
use thiserror::Error;

/// Result type alias for bucket storage operations.
pub type Result<T> = std::result::Result<T, BucketStorageError>;

/// Errors that can occur in the bucket storage facade.
#[derive(Debug, Error)]
pub enum BucketStorageError {
    /// The underlying backend failed.
    #[error("backend error: {0}")]
    Backend(#[from] StorageError),

    /// A value or envelope could not be converted to or from JSON.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Encryption or decryption failed.
    #[error("cipher error: {0}")]
    Crypto(String),

    /// Base64 or UTF-8 decoding failed.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// The configuration cannot be used.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The bucket and key resolve to the backend key that holds the key index.
    #[error("reserved key: {0}")]
    ReservedKey(String),
}
