// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Storage type selector and backend registry.
//
// A `Storages` value holds exactly one backend per `StorageType`. The bucket
// layer resolves every call's storage type through it, and the key index is
// rebuilt from all three backends at construction time.

use std::fmt;
#[cfg(feature = "redb-backend")]
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};

use crate::backend::StorageBackend;
use crate::error::StorageError;
use crate::memory::InMemoryBackend;

/// Which of the three backends an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    /// Volatile store owned by a single registry.
    Memory,
    /// Process-wide store shared by every registry in the process.
    Session,
    /// Durable store that survives restarts.
    Local,
}

impl StorageType {
    /// All storage types, in the order the key index loads them.
    pub const ALL: [StorageType; 3] = [StorageType::Local, StorageType::Session, StorageType::Memory];

    /// The lowercase wire name (`local`, `session`, `memory`).
    pub fn as_str(self) -> &'static str {
        match self {
            StorageType::Memory => "memory",
            StorageType::Session => "session",
            StorageType::Local => "local",
        }
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageType {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "memory" => Ok(StorageType::Memory),
            "session" => Ok(StorageType::Session),
            "local" => Ok(StorageType::Local),
            other => Err(StorageError::UnknownStorageType(other.to_string())),
        }
    }
}

/// The process-wide session store.
///
/// Every call returns a clone sharing the same map, so separate registries in
/// one process see the same session data.
pub fn session_backend() -> InMemoryBackend {
    static SESSION: OnceLock<InMemoryBackend> = OnceLock::new();
    SESSION
        .get_or_init(|| InMemoryBackend::with_label("session"))
        .clone()
}

/// One backend per [`StorageType`].
#[derive(Clone)]
pub struct Storages {
    local: Arc<dyn StorageBackend>,
    session: Arc<dyn StorageBackend>,
    memory: Arc<dyn StorageBackend>,
}

impl Storages {
    /// Three independent in-memory backends.
    ///
    /// Nothing is shared with other registries, which makes this the natural
    /// choice for tests and for hosts without durable storage.
    pub fn in_memory() -> Self {
        Self {
            local: Arc::new(InMemoryBackend::with_label("local")),
            session: Arc::new(InMemoryBackend::with_label("session")),
            memory: Arc::new(InMemoryBackend::with_label("memory")),
        }
    }

    /// A redb file at `path` for `local`, the process-wide session store for
    /// `session`, and a fresh map for `memory`.
    #[cfg(feature = "redb-backend")]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let local = crate::redb_backend::RedbBackend::open(path)?;
        Ok(Self {
            local: Arc::new(local),
            session: Arc::new(session_backend()),
            memory: Arc::new(InMemoryBackend::with_label("memory")),
        })
    }

    /// Start from [`Storages::in_memory`] and replace individual backends.
    pub fn builder() -> StoragesBuilder {
        StoragesBuilder {
            storages: Self::in_memory(),
        }
    }

    /// The backend registered for `storage_type`.
    pub fn get(&self, storage_type: StorageType) -> &Arc<dyn StorageBackend> {
        match storage_type {
            StorageType::Local => &self.local,
            StorageType::Session => &self.session,
            StorageType::Memory => &self.memory,
        }
    }
}

impl fmt::Debug for Storages {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Storages")
            .field("local", &self.local.name())
            .field("session", &self.session.name())
            .field("memory", &self.memory.name())
            .finish()
    }
}

/// Builder returned by [`Storages::builder`].
pub struct StoragesBuilder {
    storages: Storages,
}

impl StoragesBuilder {
    /// Use `backend` as the durable store.
    pub fn local(mut self, backend: impl StorageBackend + 'static) -> Self {
        self.storages.local = Arc::new(backend);
        self
    }

    /// Use `backend` as the session store.
    pub fn session(mut self, backend: impl StorageBackend + 'static) -> Self {
        self.storages.session = Arc::new(backend);
        self
    }

    /// Use `backend` as the volatile store.
    pub fn memory(mut self, backend: impl StorageBackend + 'static) -> Self {
        self.storages.memory = Arc::new(backend);
        self
    }

    pub fn build(self) -> Storages {
        self.storages
    }
}
