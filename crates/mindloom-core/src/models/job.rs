//! Background job model.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::chat::AnswerSentence;

/// Job lifecycle status. Transitions are owned exclusively by the worker
/// executing the job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Started,
    Succeeded,
    Failed,
}

/// Immutable work description captured at enqueue time.
///
/// Payloads are value snapshots: they never reference live session state,
/// because a job may execute arbitrarily long after enqueue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobPayload {
    MindmapUpdate {
        account_id: String,
        session_id: String,
        exchange_id: String,
        question: String,
        /// Escaped sentences, fixed at enqueue time - never re-derived.
        sentences: Vec<AnswerSentence>,
    },
    CompactMemory {
        session_id: String,
        threshold: usize,
    },
}

impl JobPayload {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MindmapUpdate { .. } => "mindmap_update",
            Self::CompactMemory { .. } => "compact_memory",
        }
    }

    pub fn session_id(&self) -> &str {
        match self {
            Self::MindmapUpdate { session_id, .. } => session_id,
            Self::CompactMemory { session_id, .. } => session_id,
        }
    }
}

/// A queued unit of work with its execution bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub payload: JobPayload,
    pub status: JobStatus,
    pub created_at: i64,
    pub started_at: Option<i64>,
    pub completed_at: Option<i64>,
    /// Human-readable result of a successful run.
    pub outcome: Option<String>,
    pub error: Option<String>,
    /// Delivery count, for observability of queue redeliveries.
    pub attempts: u32,
}

impl Job {
    pub fn new(payload: JobPayload) -> Self {
        // Nanosecond precision keeps enqueue-order priorities collision-free
        // in practice under concurrent enqueues.
        let created_at = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_else(|| {
            // Fallback for year > 2262
            chrono::Utc::now().timestamp_millis() * 1_000_000
        });

        Self {
            id: Uuid::new_v4().to_string(),
            payload,
            status: JobStatus::Pending,
            created_at,
            started_at: None,
            completed_at: None,
            outcome: None,
            error: None,
            attempts: 0,
        }
    }

    /// Mark the job as picked up by a worker.
    pub fn start(&mut self) {
        self.status = JobStatus::Started;
        self.started_at = Some(chrono::Utc::now().timestamp_millis());
        self.attempts += 1;
    }

    /// Mark the job as succeeded.
    pub fn succeed(&mut self, outcome: String) {
        self.status = JobStatus::Succeeded;
        self.completed_at = Some(chrono::Utc::now().timestamp_millis());
        self.outcome = Some(outcome);
    }

    /// Mark the job as failed.
    pub fn fail(&mut self, error: String) {
        self.status = JobStatus::Failed;
        self.completed_at = Some(chrono::Utc::now().timestamp_millis());
        self.error = Some(error);
    }

    /// Queue ordering priority (lower enqueue timestamp pops first).
    pub fn priority(&self) -> u64 {
        self.created_at as u64
    }
}
