//! Redb-backed persistent store.
//!
//! Three tables: `karma` (nick to counter), `dictionary` (word to text) and
//! `history` (nick to JSON-encoded [`SeenEntry`]). Every mutation is a single
//! write transaction.

use super::{SeenEntry, Store, StoreError};
use async_trait::async_trait;
use parking_lot::RwLock;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::sync::Arc;

const KARMA_TABLE: TableDefinition<&str, i64> = TableDefinition::new("karma");
const DICTIONARY_TABLE: TableDefinition<&str, &str> = TableDefinition::new("dictionary");
const HISTORY_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("history");

pub struct RedbStore {
    db: RwLock<Option<Arc<Database>>>,
}

fn db_err(e: impl std::fmt::Display) -> StoreError {
    StoreError::Database(e.to_string())
}

impl RedbStore {
    /// Open (or create) the database at `path` and make sure every table exists.
    pub fn new(path: &str) -> Result<Self, StoreError> {
        let db = Database::create(path).map_err(db_err)?;

        let write_txn = db.begin_write().map_err(db_err)?;
        {
            write_txn.open_table(KARMA_TABLE).map_err(db_err)?;
            write_txn.open_table(DICTIONARY_TABLE).map_err(db_err)?;
            write_txn.open_table(HISTORY_TABLE).map_err(db_err)?;
        }
        write_txn.commit().map_err(db_err)?;

        Ok(Self {
            db: RwLock::new(Some(Arc::new(db))),
        })
    }

    fn db(&self) -> Result<Arc<Database>, StoreError> {
        self.db.read().clone().ok_or(StoreError::Closed)
    }
}

#[async_trait]
impl Store for RedbStore {
    async fn karma(&self, name: &str) -> Result<i64, StoreError> {
        let db = self.db()?;
        let read_txn = db.begin_read().map_err(db_err)?;
        let table = read_txn.open_table(KARMA_TABLE).map_err(db_err)?;
        let value = table.get(name).map_err(db_err)?;
        Ok(value.map(|v| v.value()).unwrap_or(0))
    }

    async fn adjust_karma(&self, name: &str, delta: i64) -> Result<i64, StoreError> {
        let db = self.db()?;
        let write_txn = db.begin_write().map_err(db_err)?;
        let updated;
        {
            let mut table = write_txn.open_table(KARMA_TABLE).map_err(db_err)?;
            let current = table
                .get(name)
                .map_err(db_err)?
                .map(|v| v.value())
                .unwrap_or(0);
            updated = current.saturating_add(delta);
            table.insert(name, updated).map_err(db_err)?;
        }
        write_txn.commit().map_err(db_err)?;
        Ok(updated)
    }

    async fn definition(&self, word: &str) -> Result<Option<String>, StoreError> {
        let db = self.db()?;
        let read_txn = db.begin_read().map_err(db_err)?;
        let table = read_txn.open_table(DICTIONARY_TABLE).map_err(db_err)?;
        let value = table.get(word).map_err(db_err)?;
        Ok(value.map(|v| v.value().to_string()))
    }

    async fn define(&self, word: &str, text: &str) -> Result<(), StoreError> {
        let db = self.db()?;
        let write_txn = db.begin_write().map_err(db_err)?;
        {
            let mut table = write_txn.open_table(DICTIONARY_TABLE).map_err(db_err)?;
            table.insert(word, text).map_err(db_err)?;
        }
        write_txn.commit().map_err(db_err)?;
        Ok(())
    }

    async fn record_seen(&self, nick: &str, entry: SeenEntry) -> Result<(), StoreError> {
        let value =
            serde_json::to_vec(&entry).map_err(|e| StoreError::Serialization(e.to_string()))?;

        let db = self.db()?;
        let write_txn = db.begin_write().map_err(db_err)?;
        {
            let mut table = write_txn.open_table(HISTORY_TABLE).map_err(db_err)?;
            table.insert(nick, value.as_slice()).map_err(db_err)?;
        }
        write_txn.commit().map_err(db_err)?;
        Ok(())
    }

    async fn last_seen(&self, nick: &str) -> Result<Option<SeenEntry>, StoreError> {
        let db = self.db()?;
        let read_txn = db.begin_read().map_err(db_err)?;
        let table = read_txn.open_table(HISTORY_TABLE).map_err(db_err)?;
        let value = table.get(nick).map_err(db_err)?;
        match value {
            Some(v) => {
                let entry: SeenEntry = serde_json::from_slice(v.value())
                    .map_err(|e| StoreError::Serialization(e.to_string()))?;
                Ok(Some(entry))
            }
            None => Ok(None),
        }
    }

    async fn close(&self) -> Result<(), StoreError> {
        // Dropping the last handle releases the file lock.
        self.db.write().take();
        Ok(())
    }
}
