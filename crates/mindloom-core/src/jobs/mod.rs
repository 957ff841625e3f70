//! Background job bodies.
//!
//! Payloads form a closed set, so dispatch is a match rather than a dynamic
//! registry. Every body tolerates re-execution: the queue delivers
//! at-least-once.

pub mod compaction;
pub mod mindmap;

use anyhow::Result;
use std::sync::Arc;

use crate::AppCore;
use crate::models::{Job, JobPayload};

/// Execute one delivered job and return its outcome message.
pub async fn run_job(core: &Arc<AppCore>, job: &Job) -> Result<String> {
    match &job.payload {
        JobPayload::MindmapUpdate {
            account_id,
            session_id,
            exchange_id,
            question,
            sentences,
        } => {
            mindmap::run(
                core,
                account_id,
                session_id,
                exchange_id,
                question,
                sentences,
            )
            .await
        }
        JobPayload::CompactMemory {
            session_id,
            threshold,
        } => compaction::run(core, session_id, *threshold).await,
    }
}
