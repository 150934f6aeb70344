//! Durable [`KvStore`] backed by a single [`redb`] table.
//!
//! | Table | Key          | Value             |
//! |-------|--------------|-------------------|
//! | `kv`  | cache key    | serialized record |
//!
//! Every `set` is its own write transaction, so a crash leaves either the old
//! or the new value behind, never a torn one.

use std::path::{Path, PathBuf};

use redb::{Database, ReadableTable, ReadableTableMetadata, TableDefinition};

use crate::kv::{KvStore, StoreError};

const KV_TABLE: TableDefinition<&str, &str> = TableDefinition::new("kv");

pub struct RedbStore {
    db: Database,
    path: PathBuf,
}

impl RedbStore {
    /// Open or create the cache file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|err| StoreError::Backend(format!("creating {}: {err}", parent.display())))?;
            }
        }
        let db = Database::create(&path)?;

        // Ensure the table exists so reads on a fresh file don't fail.
        {
            let tx = db.begin_write()?;
            tx.open_table(KV_TABLE)?;
            tx.commit()?;
        }

        tracing::debug!(path = %path.display(), "opened local cache");
        Ok(Self { db, path })
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> Result<usize, StoreError> {
        let tx = self.db.begin_read()?;
        let tbl = tx.open_table(KV_TABLE)?;
        Ok(tbl.len()? as usize)
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KvStore for RedbStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let tx = self.db.begin_read()?;
        let tbl = tx.open_table(KV_TABLE)?;
        Ok(tbl.get(key)?.map(|v| v.value().to_string()))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let tx = self.db.begin_write()?;
        {
            let mut tbl = tx.open_table(KV_TABLE)?;
            tbl.insert(key, value)?;
        }
        tx.commit()?;
        Ok(())
    }
}
