//! Single-provider streaming responder.
//!
//! Streams one provider call with the session's history attached, relaying
//! fragments under the listener's channel (untagged - only one provider is
//! active). Persistence is post-assembly: exactly one append of the user
//! message and one of the assembled answer, never per fragment, so an
//! interrupted stream leaves the session untouched. Side effects (graph
//! update, probabilistic compaction) are fire-and-forget enqueues.

use anyhow::{Result, anyhow};
use futures::StreamExt;
use mindloom_ai::llm::{CompletionRequest, Message};
use mindloom_ai::text::{escape_graph_literal, split_sentences};
use rand::RngExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::AppCore;
use crate::models::{AnswerSentence, ChatExchange, JobPayload, MessageRole};

use super::ANSWER_SYSTEM_PROMPT;

/// One incoming chat turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub account_id: String,
    pub session_id: String,
    pub question: String,
    /// Provider label; defaults to the first registered provider.
    #[serde(default)]
    pub provider: Option<String>,
    /// Relay channel for live fragments; defaults to the account id.
    #[serde(default)]
    pub listener: Option<String>,
}

/// Result of one chat turn, with job handles for observability only.
#[derive(Debug, Clone, Serialize)]
pub struct ChatOutcome {
    pub exchange_id: String,
    pub answer: String,
    pub answer_sentences: Vec<AnswerSentence>,
    pub mindmap_job_id: Option<String>,
    pub compaction_job_id: Option<String>,
}

pub async fn respond(core: &Arc<AppCore>, request: ChatRequest) -> Result<ChatOutcome> {
    if request.question.trim().is_empty() {
        return Err(anyhow!("question must not be empty"));
    }

    let entry = match &request.provider {
        Some(label) => core
            .providers
            .get(label)
            .ok_or_else(|| anyhow!("Unknown provider: {label}"))?,
        None => core
            .providers
            .entries()
            .first()
            .ok_or_else(|| anyhow!("No providers configured"))?,
    };

    // History composition is the memory store's read path: summary first,
    // then the live sequence.
    let mut messages = vec![Message::system(ANSWER_SYSTEM_PROMPT)];
    messages.extend(core.memory.history_for(&request.session_id)?);
    messages.push(Message::user(&request.question));

    let completion_request = CompletionRequest::new(messages)
        .with_temperature(0.5)
        .with_max_tokens(4096);

    let listener = request
        .listener
        .clone()
        .unwrap_or_else(|| request.account_id.clone());
    let publisher = core
        .relay
        .paced_publisher(&listener, None, core.config.stream_pacing);

    let assembled = if entry.client.supports_streaming() {
        let mut stream = entry.client.complete_stream(completion_request);
        let mut full_response = String::new();
        let mut failure = None;

        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(chunk) => {
                    if chunk.text.trim().is_empty() {
                        continue;
                    }
                    publisher.send(chunk.text.clone());
                    full_response.push_str(&chunk.text);
                }
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        match failure {
            None => Ok(full_response),
            Some(e) => Err(e),
        }
    } else {
        entry.client.complete(completion_request).await.map(|r| {
            for word in r.content.split_whitespace() {
                publisher.send(format!("{word} "));
            }
            r.content
        })
    };

    publisher.finish().await;

    // A late stream failure aborts before persistence: no partial appends.
    let answer = assembled.map_err(|e| anyhow!("Provider call failed: {e}"))?;

    core.memory
        .append(&request.session_id, MessageRole::User, &request.question)?;
    core.memory
        .append(&request.session_id, MessageRole::Assistant, &answer)?;

    let answer_sentences: Vec<AnswerSentence> = split_sentences(&answer)
        .into_iter()
        .map(AnswerSentence::new)
        .collect();

    let exchange = ChatExchange {
        exchange_id: Uuid::new_v4().to_string(),
        account_id: request.account_id.clone(),
        session_id: request.session_id.clone(),
        question: request.question.clone(),
        answer_sentences: answer_sentences.clone(),
        created_at: chrono::Utc::now().to_rfc3339(),
    };
    core.exchanges.record(&exchange)?;

    let mindmap_job_id = enqueue_mindmap_update(core, &request, &exchange);
    let compaction_job_id = maybe_enqueue_compaction(core, &request.session_id);

    info!(
        session_id = %request.session_id,
        exchange_id = %exchange.exchange_id,
        provider = %entry.label,
        sentence_count = answer_sentences.len(),
        "Chat turn completed"
    );

    Ok(ChatOutcome {
        exchange_id: exchange.exchange_id,
        answer,
        answer_sentences,
        mindmap_job_id,
        compaction_job_id,
    })
}

/// Fire-and-forget: the request path never blocks on job results, and an
/// enqueue failure is only logged.
fn enqueue_mindmap_update(
    core: &Arc<AppCore>,
    request: &ChatRequest,
    exchange: &ChatExchange,
) -> Option<String> {
    if exchange.answer_sentences.is_empty() {
        return None;
    }

    // The job payload is a value snapshot with escaped sentence content,
    // fixed now - the graph prompt never sees live session state.
    let sentences = exchange
        .answer_sentences
        .iter()
        .map(|s| AnswerSentence {
            sentence_id: s.sentence_id.clone(),
            content: escape_graph_literal(&s.content),
        })
        .collect();

    let payload = JobPayload::MindmapUpdate {
        account_id: request.account_id.clone(),
        session_id: request.session_id.clone(),
        exchange_id: exchange.exchange_id.clone(),
        question: request.question.clone(),
        sentences,
    };

    match core.scheduler.enqueue(payload) {
        Ok(job_id) => Some(job_id),
        Err(e) => {
            warn!(session_id = %request.session_id, error = %e, "Failed to enqueue mindmap update");
            None
        }
    }
}

fn maybe_enqueue_compaction(core: &Arc<AppCore>, session_id: &str) -> Option<String> {
    let probability = core.config.compaction_probability.clamp(0.0, 1.0);
    if !rand::rng().random_bool(probability) {
        return None;
    }

    let payload = JobPayload::CompactMemory {
        session_id: session_id.to_string(),
        threshold: core.config.compaction_threshold,
    };

    match core.scheduler.enqueue(payload) {
        Ok(job_id) => Some(job_id),
        Err(e) => {
            warn!(session_id = %session_id, error = %e, "Failed to enqueue compaction");
            None
        }
    }
}
