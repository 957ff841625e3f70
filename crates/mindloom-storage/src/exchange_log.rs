//! Exchange log storage - question/answer records and graph-apply markers.
//!
//! `chat_exchanges` keeps the original (unescaped) answer sentences so
//! sentence ids embedded in graph nodes can be dereferenced later.
//! `processed_exchanges` records which exchange ids have already been applied
//! to the graph; the mindmap job consults it to stay at-most-once on top of
//! the queue's at-least-once delivery.

use anyhow::Result;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::sync::Arc;

const EXCHANGES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("chat_exchanges");
const PROCESSED_TABLE: TableDefinition<&str, &str> = TableDefinition::new("processed_exchanges");

/// Low-level exchange storage with byte-level record API
#[derive(Clone)]
pub struct ExchangeLogStorage {
    db: Arc<Database>,
}

impl ExchangeLogStorage {
    pub fn new(db: Arc<Database>) -> Result<Self> {
        let write_txn = db.begin_write()?;
        write_txn.open_table(EXCHANGES_TABLE)?;
        write_txn.open_table(PROCESSED_TABLE)?;
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Store a serialized exchange record.
    pub fn put_raw(&self, exchange_id: &str, data: &[u8]) -> Result<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(EXCHANGES_TABLE)?;
            table.insert(exchange_id, data)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Get a serialized exchange record by id.
    pub fn get_raw(&self, exchange_id: &str) -> Result<Option<Vec<u8>>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(EXCHANGES_TABLE)?;

        if let Some(data) = table.get(exchange_id)? {
            Ok(Some(data.value().to_vec()))
        } else {
            Ok(None)
        }
    }

    /// List every serialized exchange record.
    ///
    /// Records carry their session id in the payload; callers filter after
    /// decoding rather than this layer maintaining a second index.
    pub fn list_raw(&self) -> Result<Vec<Vec<u8>>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(EXCHANGES_TABLE)?;

        let mut records = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            records.push(value.value().to_vec());
        }
        Ok(records)
    }

    /// Mark an exchange as applied to the graph. Stores the apply timestamp
    /// for audit.
    pub fn mark_processed(&self, exchange_id: &str, applied_at: &str) -> Result<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(PROCESSED_TABLE)?;
            table.insert(exchange_id, applied_at)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Whether an exchange was already applied to the graph.
    pub fn is_processed(&self, exchange_id: &str) -> Result<bool> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PROCESSED_TABLE)?;
        Ok(table.get(exchange_id)?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn setup() -> (ExchangeLogStorage, tempfile::TempDir) {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let db = Arc::new(Database::create(db_path).unwrap());
        let storage = ExchangeLogStorage::new(db).unwrap();
        (storage, temp_dir)
    }

    #[test]
    fn test_put_and_get_raw() {
        let (storage, _tmp) = setup();

        storage.put_raw("ex-1", b"record").unwrap();
        assert_eq!(storage.get_raw("ex-1").unwrap().unwrap(), b"record");
        assert!(storage.get_raw("ex-2").unwrap().is_none());
    }

    #[test]
    fn test_processed_marker() {
        let (storage, _tmp) = setup();

        assert!(!storage.is_processed("ex-1").unwrap());
        storage
            .mark_processed("ex-1", "2026-01-01T00:00:00Z")
            .unwrap();
        assert!(storage.is_processed("ex-1").unwrap());

        // Marking twice is harmless
        storage
            .mark_processed("ex-1", "2026-01-01T00:00:01Z")
            .unwrap();
        assert!(storage.is_processed("ex-1").unwrap());
    }
}
