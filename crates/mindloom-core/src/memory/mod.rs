//! Memory service - typed access to session memory with a read cache.
//!
//! All session-memory access goes through this service. The cache is an
//! explicit, bounded component owned here - correctness never depends on it
//! being present, and every mutation invalidates before returning so
//! subsequent reads observe the committed state.

pub mod cache;

use anyhow::Result;
use mindloom_ai::llm::Message;
use mindloom_storage::{
    CompactionCommit, MessageRole, SessionMemory, SessionMemoryStorage, StoredMessage,
};

pub use cache::{Cache, CacheConfig};

pub struct MemoryService {
    storage: SessionMemoryStorage,
    cache: Cache<String, SessionMemory>,
}

impl MemoryService {
    pub fn new(storage: SessionMemoryStorage, cache_config: CacheConfig) -> Self {
        Self {
            storage,
            cache: Cache::new(cache_config),
        }
    }

    /// Append one message to a session, creating it if absent.
    pub fn append(&self, session_id: &str, role: MessageRole, content: &str) -> Result<()> {
        self.storage.append(session_id, role, content)?;
        self.cache.remove(&session_id.to_string());
        Ok(())
    }

    /// Read the session document, via cache when fresh.
    pub fn read(&self, session_id: &str) -> Result<Option<SessionMemory>> {
        let key = session_id.to_string();
        if let Some(doc) = self.cache.get(&key) {
            return Ok(Some(doc));
        }

        let doc = self.storage.read(session_id)?;
        if let Some(doc) = &doc {
            self.cache.set(key, doc.clone());
        }
        Ok(doc)
    }

    /// Compose a session's prompt history: the rolling summary (if any) as a
    /// leading system turn, then the live message sequence.
    pub fn history_for(&self, session_id: &str) -> Result<Vec<Message>> {
        let Some(doc) = self.read(session_id)? else {
            return Ok(Vec::new());
        };

        let mut history = Vec::with_capacity(doc.messages.len() + 1);
        if let Some(summary) = &doc.summary {
            history.push(Message::system(format!(
                "Summary of the earlier conversation: {summary}"
            )));
        }

        for message in &doc.messages {
            history.push(match message.role {
                MessageRole::User => Message::user(&message.content),
                MessageRole::Assistant => Message::assistant(&message.content),
                MessageRole::Summary => Message::system(&message.content),
            });
        }

        Ok(history)
    }

    /// Atomically replace the summary and remove the snapshotted messages.
    pub fn commit_compaction(
        &self,
        session_id: &str,
        new_summary: &str,
        snapshot: &[StoredMessage],
    ) -> Result<CompactionCommit> {
        let outcome = self
            .storage
            .commit_compaction(session_id, new_summary, snapshot)?;
        self.cache.remove(&session_id.to_string());
        Ok(outcome)
    }

    /// Delete a session's memory entirely. Administrative use only.
    pub fn clear(&self, session_id: &str) -> Result<bool> {
        let existed = self.storage.clear(session_id)?;
        self.cache.remove(&session_id.to_string());
        Ok(existed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mindloom_ai::llm::Role;
    use mindloom_storage::Storage;
    use tempfile::tempdir;

    fn setup() -> (MemoryService, tempfile::TempDir) {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("test.db");
        let storage = Storage::new(path.to_str().unwrap()).unwrap();
        let service = MemoryService::new(storage.memories.clone(), CacheConfig::default());
        (service, tmp)
    }

    #[test]
    fn test_history_injects_summary_as_system_turn() {
        let (service, _tmp) = setup();

        service.append("room-1", MessageRole::User, "hi").unwrap();
        service
            .append("room-1", MessageRole::Assistant, "hello")
            .unwrap();

        let doc = service.read("room-1").unwrap().unwrap();
        service
            .commit_compaction("room-1", "they greeted each other", &doc.messages[..1])
            .unwrap();

        let history = service.history_for("room-1").unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::System);
        assert!(history[0].content.contains("they greeted each other"));
        assert_eq!(history[1].role, Role::Assistant);
    }

    #[test]
    fn test_history_for_unknown_session_is_empty() {
        let (service, _tmp) = setup();
        assert!(service.history_for("missing").unwrap().is_empty());
    }

    #[test]
    fn test_cache_invalidated_on_append() {
        let (service, _tmp) = setup();

        service.append("room-1", MessageRole::User, "one").unwrap();
        // Prime the cache
        assert_eq!(service.read("room-1").unwrap().unwrap().messages.len(), 1);

        service.append("room-1", MessageRole::User, "two").unwrap();
        assert_eq!(service.read("room-1").unwrap().unwrap().messages.len(), 2);
    }
}
