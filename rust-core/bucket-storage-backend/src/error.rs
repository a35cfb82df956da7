// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Storage error types for the bucket-storage backend abstraction.
//
// Provides a unified error enum covering the failure modes a string
// key-value backend may run into: I/O errors, unavailable or corrupted
// backing stores, and unknown storage type names.

use thiserror::Error;

/// Errors that can occur when interacting with a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred in the underlying storage layer.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stored data is corrupted or in an unexpected format.
    #[error("corrupted data: {0}")]
    CorruptedData(String),

    /// The storage backend is not available (e.g., database file locked).
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    /// A storage type name did not match `local`, `session` or `memory`.
    #[error("unknown storage type: {0}")]
    UnknownStorageType(String),
}
