//! Session memory storage - per-session message sequences with a rolling summary.
//!
//! A session document holds the ordered message list plus an optional summary
//! string. The two mutations that matter for correctness - `append` and
//! `commit_compaction` - each run inside one write transaction, so the
//! database commit is the serialization point for concurrent writers. No
//! caller ever reads the list, edits it in memory and writes it back across
//! transaction boundaries; that read-modify-write window is exactly the
//! lost-update race compaction is designed to avoid.

use anyhow::Result;
use chrono::Utc;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const MEMORY_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("session_memories");

/// Role of a stored conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    /// Marker for summary turns injected into the prompt history.
    Summary,
}

/// One message in a session's ordered sequence.
///
/// Insertion order is the only ordering signal; equality is by value, which
/// is what compaction's snapshot-based removal relies on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub role: MessageRole,
    pub content: String,
}

impl StoredMessage {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Persistent memory document for one session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMemory {
    pub session_id: String,
    #[serde(default)]
    pub messages: Vec<StoredMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub updated_at: String,
}

impl SessionMemory {
    fn empty(session_id: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            messages: Vec::new(),
            summary: None,
            updated_at: Utc::now().to_rfc3339(),
        }
    }
}

/// Outcome of an atomic compaction commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompactionCommit {
    /// Summary replaced and this many snapshotted messages removed.
    Applied { removed: usize },
    /// The session document disappeared between snapshot and commit.
    SessionMissing,
}

/// Session memory storage backed by redb.
#[derive(Clone)]
pub struct SessionMemoryStorage {
    db: Arc<Database>,
}

impl SessionMemoryStorage {
    pub fn new(db: Arc<Database>) -> Result<Self> {
        let write_txn = db.begin_write()?;
        write_txn.open_table(MEMORY_TABLE)?;
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Append one message to the end of the session's sequence, creating the
    /// session document if absent.
    ///
    /// Safe to call concurrently for the same session: the whole
    /// load-push-store runs in one write transaction, so appends are
    /// linearized by commit order and none are lost.
    pub fn append(&self, session_id: &str, role: MessageRole, content: &str) -> Result<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(MEMORY_TABLE)?;

            let mut doc = match table.get(session_id)? {
                Some(raw) => serde_json::from_slice::<SessionMemory>(raw.value())?,
                None => SessionMemory::empty(session_id),
            };

            doc.messages.push(StoredMessage::new(role, content));
            doc.updated_at = Utc::now().to_rfc3339();

            let serialized = serde_json::to_vec(&doc)?;
            table.insert(session_id, serialized.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Read the full memory document for a session.
    pub fn read(&self, session_id: &str) -> Result<Option<SessionMemory>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(MEMORY_TABLE)?;

        match table.get(session_id)? {
            Some(raw) => Ok(Some(serde_json::from_slice(raw.value())?)),
            None => Ok(None),
        }
    }

    /// Atomically replace the summary and remove exactly the snapshotted
    /// messages, in one transaction.
    ///
    /// Removal is value-based: for each snapshot entry, the first remaining
    /// equal message (scanning from the front) is deleted. Messages appended
    /// after the snapshot was taken survive regardless of their position,
    /// and a message value the snapshot holds twice is only removed twice.
    /// Either the summary write and every removal land together or nothing
    /// does.
    pub fn commit_compaction(
        &self,
        session_id: &str,
        new_summary: &str,
        snapshot: &[StoredMessage],
    ) -> Result<CompactionCommit> {
        let write_txn = self.db.begin_write()?;
        let outcome = {
            let mut table = write_txn.open_table(MEMORY_TABLE)?;

            let existing = match table.get(session_id)? {
                Some(raw) => Some(serde_json::from_slice::<SessionMemory>(raw.value())?),
                None => None,
            };
            let Some(mut doc) = existing else {
                drop(table);
                write_txn.abort()?;
                return Ok(CompactionCommit::SessionMissing);
            };

            let mut removed = 0usize;
            for target in snapshot {
                if let Some(pos) = doc.messages.iter().position(|m| m == target) {
                    doc.messages.remove(pos);
                    removed += 1;
                }
            }

            doc.summary = Some(new_summary.to_string());
            doc.updated_at = Utc::now().to_rfc3339();

            let serialized = serde_json::to_vec(&doc)?;
            table.insert(session_id, serialized.as_slice())?;

            CompactionCommit::Applied { removed }
        };
        write_txn.commit()?;
        Ok(outcome)
    }

    /// Delete a session's memory entirely. Administrative use only.
    pub fn clear(&self, session_id: &str) -> Result<bool> {
        let write_txn = self.db.begin_write()?;
        let existed = {
            let mut table = write_txn.open_table(MEMORY_TABLE)?;
            table.remove(session_id)?.is_some()
        };
        write_txn.commit()?;
        Ok(existed)
    }

    /// List all session ids with stored memory.
    pub fn list_sessions(&self) -> Result<Vec<String>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(MEMORY_TABLE)?;

        let mut ids = Vec::new();
        for entry in table.iter()? {
            let (key, _) = entry?;
            ids.push(key.value().to_string());
        }
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn setup() -> (SessionMemoryStorage, tempfile::TempDir) {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let db = Arc::new(Database::create(db_path).unwrap());
        let storage = SessionMemoryStorage::new(db).unwrap();
        (storage, temp_dir)
    }

    #[test]
    fn test_append_creates_session() {
        let (storage, _tmp) = setup();

        storage.append("room-1", MessageRole::User, "hello").unwrap();
        let doc = storage.read("room-1").unwrap().unwrap();

        assert_eq!(doc.messages.len(), 1);
        assert_eq!(doc.messages[0].content, "hello");
        assert!(doc.summary.is_none());
    }

    #[test]
    fn test_append_preserves_order() {
        let (storage, _tmp) = setup();

        for i in 0..10 {
            storage
                .append("room-1", MessageRole::User, &format!("msg-{i}"))
                .unwrap();
        }

        let doc = storage.read("room-1").unwrap().unwrap();
        let contents: Vec<&str> = doc.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents[0], "msg-0");
        assert_eq!(contents[9], "msg-9");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_concurrent_appends_all_land() {
        let (storage, _tmp) = setup();

        let mut handles = Vec::new();
        for i in 0..20 {
            let storage = storage.clone();
            handles.push(tokio::task::spawn_blocking(move || {
                storage
                    .append("room-1", MessageRole::User, &format!("m{i}"))
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let doc = storage.read("room-1").unwrap().unwrap();
        assert_eq!(doc.messages.len(), 20);
    }

    #[test]
    fn test_commit_compaction_removes_only_snapshot() {
        let (storage, _tmp) = setup();

        for i in 0..60 {
            storage
                .append("room-1", MessageRole::User, &format!("msg-{i}"))
                .unwrap();
        }

        let before = storage.read("room-1").unwrap().unwrap();
        let snapshot: Vec<StoredMessage> = before.messages[..5].to_vec();

        // Concurrent appends arrive while the summary is being generated.
        for i in 0..3 {
            storage
                .append("room-1", MessageRole::User, &format!("late-{i}"))
                .unwrap();
        }

        let outcome = storage
            .commit_compaction("room-1", "the summary", &snapshot)
            .unwrap();
        assert_eq!(outcome, CompactionCommit::Applied { removed: 5 });

        let after = storage.read("room-1").unwrap().unwrap();
        assert_eq!(after.messages.len(), 58);
        assert_eq!(after.summary.as_deref(), Some("the summary"));

        // None of the snapshotted messages survive.
        for target in &snapshot {
            assert!(!after.messages.contains(target));
        }
        // All late arrivals survive.
        for i in 0..3 {
            assert!(
                after
                    .messages
                    .iter()
                    .any(|m| m.content == format!("late-{i}"))
            );
        }
        // The untouched middle is byte-identical to before.
        assert_eq!(&after.messages[..55], &before.messages[5..60]);
    }

    #[test]
    fn test_commit_compaction_duplicate_values_remove_one_occurrence() {
        let (storage, _tmp) = setup();

        storage.append("room-1", MessageRole::User, "same").unwrap();
        storage.append("room-1", MessageRole::User, "same").unwrap();
        storage.append("room-1", MessageRole::User, "other").unwrap();

        let snapshot = vec![StoredMessage::new(MessageRole::User, "same")];
        storage
            .commit_compaction("room-1", "s", &snapshot)
            .unwrap();

        let doc = storage.read("room-1").unwrap().unwrap();
        assert_eq!(doc.messages.len(), 2);
        assert_eq!(doc.messages[0].content, "same");
        assert_eq!(doc.messages[1].content, "other");
    }

    #[test]
    fn test_commit_compaction_missing_session() {
        let (storage, _tmp) = setup();

        let outcome = storage
            .commit_compaction("nope", "s", &[StoredMessage::new(MessageRole::User, "x")])
            .unwrap();
        assert_eq!(outcome, CompactionCommit::SessionMissing);
    }

    #[test]
    fn test_clear() {
        let (storage, _tmp) = setup();

        storage.append("room-1", MessageRole::User, "hello").unwrap();
        assert!(storage.clear("room-1").unwrap());
        assert!(storage.read("room-1").unwrap().is_none());
        assert!(!storage.clear("room-1").unwrap());
    }
}
