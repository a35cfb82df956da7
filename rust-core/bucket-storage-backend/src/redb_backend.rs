// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <j.d.a.jewell@open.ac.uk>
//
// redb-backed durable storage backend for bucket-storage.
//
// Uses redb (pure Rust, B-tree, ACID, single-file database) as the `local`
// store: the one whose contents survive a process restart. No C/C++
// dependencies, builds on any platform with a Rust toolchain.
//
// # Design
//
// - Single redb `Database` file containing one string-to-string table.
// - Read transactions for `get_item`, `len` and `key`.
// - One committed write transaction per `set_item`/`remove_item`/`clear`.
// - `clear()` drops the table; the next write recreates it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition, TableError,
};
use tracing::debug;

use crate::backend::StorageBackend;
use crate::error::StorageError;

/// Table definition for the main key-value store.
const MAIN_TABLE: TableDefinition<&str, &str> = TableDefinition::new("bucket_storage");

/// A durable storage backend powered by redb.
///
/// Thread-safe: `Database` is `Send + Sync` and handles internal locking.
///
/// # Example
///
/// ```rust,no_run
/// use bucket_storage_backend::redb_backend::RedbBackend;
/// use bucket_storage_backend::backend::StorageBackend;
///
/// let store = RedbBackend::open("/tmp/bucket-storage.redb").unwrap();
/// store.set_item("hello", "world").unwrap();
/// assert_eq!(store.get_item("hello").unwrap(), Some("world".to_string()));
/// ```
pub struct RedbBackend {
    /// The redb database handle.
    db: Arc<Database>,
    /// Path to the database file (for diagnostics).
    path: PathBuf,
}

impl RedbBackend {
    /// Open or create a redb database at the given path.
    ///
    /// Creates the file and parent directories if they don't exist. The main
    /// table is created on first write.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(StorageError::Io)?;
        }

        let db = Database::create(&path).map_err(|e| {
            StorageError::BackendUnavailable(format!(
                "failed to open redb at {}: {}",
                path.display(),
                e
            ))
        })?;

        debug!(path = %path.display(), "opened redb backend");

        Ok(Self {
            db: Arc::new(db),
            path,
        })
    }

    /// Return the filesystem path of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `write` inside a committed write transaction on the main table.
    fn write_with<F>(&self, op: &str, write: F) -> Result<(), StorageError>
    where
        F: FnOnce(&mut redb::Table<'_, &'static str, &'static str>) -> Result<(), redb::StorageError>,
    {
        let txn = self
            .db
            .begin_write()
            .map_err(|e| StorageError::BackendUnavailable(format!("write txn: {e}")))?;
        {
            let mut table = txn
                .open_table(MAIN_TABLE)
                .map_err(|e| StorageError::BackendUnavailable(format!("open table: {e}")))?;
            write(&mut table).map_err(|e| StorageError::CorruptedData(format!("{op}: {e}")))?;
        }
        txn.commit()
            .map_err(|e| StorageError::CorruptedData(format!("commit: {e}")))
    }
}

impl std::fmt::Debug for RedbBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbBackend")
            .field("path", &self.path)
            .finish()
    }
}

impl StorageBackend for RedbBackend {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let txn = self
            .db
            .begin_read()
            .map_err(|e| StorageError::BackendUnavailable(format!("read txn: {e}")))?;

        let table = match txn.open_table(MAIN_TABLE) {
            Ok(t) => t,
            // Table doesn't exist yet: nothing has been written
            Err(TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(e) => return Err(StorageError::BackendUnavailable(format!("open table: {e}"))),
        };

        match table.get(key) {
            Ok(Some(value)) => Ok(Some(value.value().to_string())),
            Ok(None) => Ok(None),
            Err(e) => Err(StorageError::CorruptedData(format!("get: {e}"))),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.write_with("insert", |table| table.insert(key, value).map(|_| ()))
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.write_with("remove", |table| table.remove(key).map(|_| ()))
    }

    fn clear(&self) -> Result<(), StorageError> {
        let txn = self
            .db
            .begin_write()
            .map_err(|e| StorageError::BackendUnavailable(format!("write txn: {e}")))?;
        txn.delete_table(MAIN_TABLE)
            .map_err(|e| StorageError::CorruptedData(format!("delete table: {e}")))?;
        txn.commit()
            .map_err(|e| StorageError::CorruptedData(format!("commit: {e}")))?;
        debug!(path = %self.path.display(), "cleared redb backend");
        Ok(())
    }

    fn len(&self) -> Result<usize, StorageError> {
        let txn = self
            .db
            .begin_read()
            .map_err(|e| StorageError::BackendUnavailable(format!("read txn: {e}")))?;
        let table = match txn.open_table(MAIN_TABLE) {
            Ok(t) => t,
            Err(TableError::TableDoesNotExist(_)) => return Ok(0),
            Err(e) => return Err(StorageError::BackendUnavailable(format!("open table: {e}"))),
        };
        let len = table
            .len()
            .map_err(|e| StorageError::CorruptedData(format!("len: {e}")))?;
        Ok(len as usize)
    }

    fn key(&self, index: usize) -> Result<Option<String>, StorageError> {
        let txn = self
            .db
            .begin_read()
            .map_err(|e| StorageError::BackendUnavailable(format!("read txn: {e}")))?;
        let table = match txn.open_table(MAIN_TABLE) {
            Ok(t) => t,
            Err(TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(e) => return Err(StorageError::BackendUnavailable(format!("open table: {e}"))),
        };

        let mut iter = table
            .iter()
            .map_err(|e| StorageError::CorruptedData(format!("iter: {e}")))?;

        // Bound first so the access guards drop before `table`.
        let found = match iter.nth(index) {
            Some(Ok((k, _))) => Ok(Some(k.value().to_string())),
            Some(Err(e)) => Err(StorageError::CorruptedData(format!("key: {e}"))),
            None => Ok(None),
        };
        found
    }

    fn name(&self) -> &str {
        "redb"
    }
}
