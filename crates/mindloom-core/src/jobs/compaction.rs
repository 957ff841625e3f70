//! Compaction job - folds a session's oldest messages into the rolling
//! summary.
//!
//! The safety property is snapshot-based deletion: the exact message values
//! selected in step 3 are the only thing the commit may remove, so messages
//! appended while the summarizer runs are never lost. The commit itself is
//! one atomic storage operation; on any error the job aborts with nothing
//! written.

use anyhow::{Result, anyhow};
use mindloom_ai::llm::{CompletionRequest, Message};
use mindloom_storage::{CompactionCommit, MessageRole, StoredMessage};
use std::sync::Arc;
use tracing::info;

use crate::AppCore;

const SUMMARY_PROMPT: &str = include_str!("prompts/memory_summary.md");

/// How many of the oldest messages one pass folds away.
const COMPACTION_BATCH: usize = 5;

pub async fn run(core: &Arc<AppCore>, session_id: &str, threshold: usize) -> Result<String> {
    // 1. Load
    let Some(doc) = core.memory.read(session_id)? else {
        return Ok("no messages found".to_string());
    };

    // 2. Gate
    if doc.messages.len() <= threshold {
        return Ok("not enough messages to compact".to_string());
    }

    // 3. Snapshot the oldest k message values; only these may be deleted
    let target_count = COMPACTION_BATCH.min(doc.messages.len() / 2);
    if target_count == 0 {
        return Ok("skipped compaction".to_string());
    }
    let snapshot: Vec<StoredMessage> = doc.messages[..target_count].to_vec();

    // 4. Summarize snapshot plus previous summary
    let new_summary = summarize(core, doc.summary.as_deref().unwrap_or(""), &snapshot).await?;

    // 5. Commit atomically: summary replace + value-based snapshot removal
    match core
        .memory
        .commit_compaction(session_id, &new_summary, &snapshot)?
    {
        CompactionCommit::Applied { removed } => {
            info!(session_id = %session_id, removed, "Compacted session memory");
            Ok(format!("compacted {removed} messages"))
        }
        CompactionCommit::SessionMissing => Ok("session cleared during compaction".to_string()),
    }
}

async fn summarize(
    core: &Arc<AppCore>,
    previous_summary: &str,
    snapshot: &[StoredMessage],
) -> Result<String> {
    let summarizer = core
        .providers
        .text_generator()
        .ok_or_else(|| anyhow!("No text-generation provider configured"))?;

    let conversation = snapshot
        .iter()
        .map(|message| format!("{}: {}", role_name(message.role), message.content))
        .collect::<Vec<_>>()
        .join("\n");

    let prompt = SUMMARY_PROMPT
        .replace("{previous_summary}", previous_summary)
        .replace("{conversation}", &conversation);

    let response = summarizer
        .client
        .complete(CompletionRequest::new(vec![Message::user(prompt)]).with_max_tokens(512))
        .await
        .map_err(|e| anyhow!("Summary generation failed: {e}"))?;

    let summary = response.content.trim().to_string();
    if summary.is_empty() {
        return Err(anyhow!("Summarizer returned an empty summary"));
    }
    Ok(summary)
}

fn role_name(role: MessageRole) -> &'static str {
    match role {
        MessageRole::User => "user",
        MessageRole::Assistant => "assistant",
        MessageRole::Summary => "summary",
    }
}
