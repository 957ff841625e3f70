//! Mindloom Storage - Low-level persistence layer
//!
//! This crate provides the persistence layer for Mindloom, using redb as the
//! embedded database. Every mutation is expressed as a single write
//! transaction so that concurrent callers serialize on the database commit
//! rather than on ad-hoc read-modify-write cycles.
//!
//! # Tables
//!
//! - `jobs_pending` / `jobs_processing` / `jobs_completed` - durable job queue
//! - `session_memories` - per-session message sequences plus rolling summary
//! - `chat_exchanges` - question/answer records keyed by exchange id
//! - `processed_exchanges` - exchange ids already applied to the graph

pub mod exchange_log;
pub mod job_queue;
pub mod session_memory;

use anyhow::Result;
use redb::Database;
use std::sync::Arc;

pub use exchange_log::ExchangeLogStorage;
pub use job_queue::JobQueueStorage;
pub use session_memory::{CompactionCommit, MessageRole, SessionMemory, SessionMemoryStorage, StoredMessage};

/// Central storage manager that initializes all storage subsystems
pub struct Storage {
    db: Arc<Database>,
    pub jobs: JobQueueStorage,
    pub memories: SessionMemoryStorage,
    pub exchanges: ExchangeLogStorage,
}

impl Storage {
    /// Create a new storage instance at the given path.
    ///
    /// Creates the database file if it doesn't exist and initializes all
    /// required tables.
    pub fn new(path: &str) -> Result<Self> {
        let db = Arc::new(Database::create(path)?);
        Self::with_database(db)
    }

    /// Build the storage manager over an already-open database.
    pub fn with_database(db: Arc<Database>) -> Result<Self> {
        let jobs = JobQueueStorage::new(db.clone())?;
        let memories = SessionMemoryStorage::new(db.clone())?;
        let exchanges = ExchangeLogStorage::new(db.clone())?;

        Ok(Self {
            db,
            jobs,
            memories,
            exchanges,
        })
    }

    /// Get a reference to the underlying database
    pub fn get_db(&self) -> Arc<Database> {
        self.db.clone()
    }
}
