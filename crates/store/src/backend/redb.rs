//! redb backend for persistent item storage.
//!
//! ```yaml
//! store:
//!   backend: redb
//!   path: /var/lib/lostfound/items.redb
//! ```

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

use crate::{StoreBackend, StoreError};

const ITEMS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("lostfound_items");

/// Each write runs in its own redb write transaction; redb allows a single
/// writer at a time, which makes `compare_and_put` atomic.
pub struct RedbBackend {
    db: Arc<Database>,
}

impl RedbBackend {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = Database::create(path).map_err(StoreError::backend)?;

        let write_txn = db.begin_write().map_err(StoreError::backend)?;
        {
            // Opening the table creates it on first use.
            let _table = write_txn
                .open_table(ITEMS_TABLE)
                .map_err(StoreError::backend)?;
        }
        write_txn.commit().map_err(StoreError::backend)?;

        Ok(Self { db: Arc::new(db) })
    }
}

impl StoreBackend for RedbBackend {
    fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let write_txn = self.db.begin_write().map_err(StoreError::backend)?;
        {
            let mut table = write_txn
                .open_table(ITEMS_TABLE)
                .map_err(StoreError::backend)?;
            table.insert(key, value).map_err(StoreError::backend)?;
        }
        write_txn.commit().map_err(StoreError::backend)?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let read_txn = self.db.begin_read().map_err(StoreError::backend)?;
        let table = read_txn
            .open_table(ITEMS_TABLE)
            .map_err(StoreError::backend)?;
        let value = table.get(key).map_err(StoreError::backend)?;
        Ok(value.map(|v| v.value().to_vec()))
    }

    fn scan(
        &self,
        visitor: &mut dyn FnMut(&[u8]) -> Result<(), StoreError>,
    ) -> Result<(), StoreError> {
        let read_txn = self.db.begin_read().map_err(StoreError::backend)?;
        let table = read_txn
            .open_table(ITEMS_TABLE)
            .map_err(StoreError::backend)?;
        for entry in table.iter().map_err(StoreError::backend)? {
            let (_, value) = entry.map_err(StoreError::backend)?;
            visitor(value.value())?;
        }
        Ok(())
    }

    fn compare_and_put(
        &self,
        key: &str,
        expected: &[u8],
        value: &[u8],
    ) -> Result<bool, StoreError> {
        let write_txn = self.db.begin_write().map_err(StoreError::backend)?;
        let swapped = {
            let mut table = write_txn
                .open_table(ITEMS_TABLE)
                .map_err(StoreError::backend)?;
            let matches = match table.get(key).map_err(StoreError::backend)? {
                Some(current) => current.value() == expected,
                None => false,
            };
            if matches {
                table.insert(key, value).map_err(StoreError::backend)?;
            }
            matches
        };
        if swapped {
            write_txn.commit().map_err(StoreError::backend)?;
        } else {
            write_txn.abort().map_err(StoreError::backend)?;
        }
        Ok(swapped)
    }
}
