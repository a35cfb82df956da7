// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bucket Storage Backend Abstraction
//
// This crate provides the primitive string key-value stores that the
// `bucket-storage` facade builds on. Every store implements the same
// synchronous `StorageBackend` trait, so the durable, session and volatile
// stores are interchangeable.
//
// # Modules
//
// - [`backend`] -- The `StorageBackend` trait defining the key-value interface.
// - [`error`] -- The `StorageError` enum covering all backend failure modes.
// - [`memory`] -- An in-memory `BTreeMap`-based backend.
// - [`registry`] -- `StorageType` and the `Storages` registry mapping each
//   type to a backend.
// - [`redb_backend`] -- The durable redb backend (feature `redb-backend`).
//
// # Example
//
// ```rust
// use bucket_storage_backend::{Storages, StorageType};
//
// let storages = Storages::in_memory();
// let memory = storages.get(StorageType::Memory);
// memory.set_item("greeting", "hello").unwrap();
// assert_eq!(memory.get_item("greeting").unwrap().as_deref(), Some("hello"));
// ```

pub mod backend;
pub mod error;
pub mod memory;
pub mod registry;

// Optional persistent backends, feature-gated like the rest of the workspace.
#[cfg(feature = "redb-backend")]
pub mod redb_backend;

// Re-export the most commonly used types at the crate root for convenience.
pub use backend::StorageBackend;
pub use error::StorageError;
pub use memory::InMemoryBackend;
pub use registry::{session_backend, StorageType, Storages, StoragesBuilder};

#[cfg(feature = "redb-backend")]
pub use redb_backend::RedbBackend;
