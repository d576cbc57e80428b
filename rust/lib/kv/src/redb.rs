use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use redb::{Database, ReadableTable, TableDefinition};
use tracing::debug;

use crate::entry::{now_ms, Entry};
use crate::error::KVError;
use crate::traits::KVStore;

const TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("kv");

/// RedbStore is a KVStore implementation backed by redb: a pure-Rust embedded
/// key-value database. Values are wrapped in an [`Entry`] envelope carrying
/// their expiry; expired entries stay on disk until [`KVStore::purge_expired`].
pub struct RedbStore {
    db: Arc<Database>,
}

fn storage<E: std::fmt::Display>(e: E) -> KVError {
    KVError::Storage(e.to_string())
}

impl RedbStore {
    /// Open or create a redb database at the given path.
    pub fn open(path: &Path) -> Result<Self, KVError> {
        let db = Database::create(path).map_err(storage)?;

        // Ensure the table exists by doing a write transaction.
        let write_txn = db.begin_write().map_err(storage)?;
        {
            let _table = write_txn.open_table(TABLE).map_err(storage)?;
        }
        write_txn.commit().map_err(storage)?;

        Ok(Self { db: Arc::new(db) })
    }
}

impl KVStore for RedbStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KVError> {
        let read_txn = self.db.begin_read().map_err(storage)?;
        let table = read_txn.open_table(TABLE).map_err(storage)?;

        let raw = match table.get(key).map_err(storage)? {
            Some(val) => val.value().to_vec(),
            None => return Ok(None),
        };
        let entry = Entry::decode(&raw)?;
        if entry.is_expired(now_ms()) {
            return Ok(None);
        }
        Ok(Some(entry.value))
    }

    fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<(), KVError> {
        let encoded = Entry::new(value, ttl, now_ms()).encode();
        let write_txn = self.db.begin_write().map_err(storage)?;
        {
            let mut table = write_txn.open_table(TABLE).map_err(storage)?;
            table.insert(key, encoded.as_slice()).map_err(storage)?;
        }
        write_txn.commit().map_err(storage)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), KVError> {
        let write_txn = self.db.begin_write().map_err(storage)?;
        {
            let mut table = write_txn.open_table(TABLE).map_err(storage)?;
            table.remove(key).map_err(storage)?;
        }
        write_txn.commit().map_err(storage)?;
        Ok(())
    }

    fn scan(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, KVError> {
        let read_txn = self.db.begin_read().map_err(storage)?;
        let table = read_txn.open_table(TABLE).map_err(storage)?;
        let now = now_ms();

        let mut results = Vec::new();
        let iter = table.range(prefix..).map_err(storage)?;

        for item in iter {
            let (key, raw) = item.map_err(storage)?;
            let key = key.value().to_string();
            if !key.starts_with(prefix) {
                break;
            }
            let entry = Entry::decode(raw.value())?;
            if entry.is_expired(now) {
                continue;
            }
            results.push((key, entry.value));
        }

        Ok(results)
    }

    fn purge_expired(&self) -> Result<usize, KVError> {
        let now = now_ms();
        let write_txn = self.db.begin_write().map_err(storage)?;
        let removed = {
            let mut table = write_txn.open_table(TABLE).map_err(storage)?;

            let mut expired = Vec::new();
            for item in table.iter().map_err(storage)? {
                let (key, raw) = item.map_err(storage)?;
                // Undecodable entries are left alone for inspection.
                if let Ok(entry) = Entry::decode(raw.value()) {
                    if entry.is_expired(now) {
                        expired.push(key.value().to_string());
                    }
                }
            }

            for key in &expired {
                table.remove(key.as_str()).map_err(storage)?;
            }
            expired.len()
        };
        write_txn.commit().map_err(storage)?;

        if removed > 0 {
            debug!(removed, "purged expired kv entries");
        }
        Ok(removed)
    }
}
