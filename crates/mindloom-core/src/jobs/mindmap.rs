//! Mindmap update job - turns one question/answer exchange into graph
//! mutations.
//!
//! The mutation statement is generated by the text-generation collaborator
//! and is opaque here; this job's contract is to supply well-formed input
//! (structure snapshot, escaped question, fixed sentence list) and execute
//! whatever comes back. Two layers keep re-execution from duplicating
//! nodes: the prompt mandates MERGE on sentence_ref, and an exchange
//! already marked processed short-circuits before any work.

use anyhow::{Context, Result, anyhow};
use mindloom_ai::llm::{CompletionRequest, Message};
use mindloom_ai::text::escape_graph_literal;
use std::sync::Arc;
use tracing::{error, info};

use crate::AppCore;
use crate::models::AnswerSentence;

const MINDMAP_PROMPT: &str = include_str!("prompts/mindmap_update.md");

pub async fn run(
    core: &Arc<AppCore>,
    account_id: &str,
    session_id: &str,
    exchange_id: &str,
    question: &str,
    sentences: &[AnswerSentence],
) -> Result<String> {
    let result = apply(core, account_id, session_id, exchange_id, question, sentences).await;

    // Single attempt per delivery; redelivery belongs to the queue. Log the
    // full context the operator needs to diagnose a failed mutation.
    if let Err(e) = &result {
        error!(
            session_id = %session_id,
            exchange_id = %exchange_id,
            question = %question,
            sentence_count = sentences.len(),
            error = %e,
            "Mindmap update failed"
        );
    }

    result
}

async fn apply(
    core: &Arc<AppCore>,
    account_id: &str,
    session_id: &str,
    exchange_id: &str,
    question: &str,
    sentences: &[AnswerSentence],
) -> Result<String> {
    if core.exchanges.is_processed(exchange_id)? {
        info!(exchange_id = %exchange_id, "Exchange already applied to graph, skipping");
        return Ok("already applied".to_string());
    }

    let generator = core
        .providers
        .text_generator()
        .ok_or_else(|| anyhow!("No text-generation provider configured"))?;

    let structure = core
        .graph
        .fetch_structure(account_id, session_id)
        .await
        .context("Failed to read graph structure")?;

    let structure_text = if structure.is_null()
        || structure.as_array().is_some_and(|rows| rows.is_empty())
    {
        "No nodes exist yet.".to_string()
    } else {
        serde_json::to_string_pretty(&structure)?
    };

    let answer_lines = sentences
        .iter()
        .map(|s| format!("- [{}] {}", s.sentence_id, s.content))
        .collect::<Vec<_>>()
        .join("\n");

    let prompt = MINDMAP_PROMPT
        .replace("{structure}", &structure_text)
        .replace("{question}", &escape_graph_literal(question))
        .replace("{answer_lines}", &answer_lines)
        .replace("{session_id}", session_id)
        .replace("{account_id}", account_id);

    let response = generator
        .client
        .complete(CompletionRequest::new(vec![Message::user(prompt)]).with_max_tokens(4096))
        .await
        .map_err(|e| anyhow!("Mutation generation failed: {e}"))?;

    let statement = strip_code_fence(&response.content);
    if statement.is_empty() {
        return Err(anyhow!("Generated mutation statement was empty"));
    }

    core.graph
        .execute(statement)
        .await
        .context("Failed to execute graph mutation")?;

    core.exchanges.mark_processed(exchange_id)?;

    info!(
        session_id = %session_id,
        exchange_id = %exchange_id,
        sentence_count = sentences.len(),
        "Mindmap updated"
    );
    Ok(format!("applied {} sentences", sentences.len()))
}

/// Models wrap queries in markdown fences despite instructions not to.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    let inner = inner.strip_suffix("```").unwrap_or(inner);
    // Drop the language tag line if present
    match inner.split_once('\n') {
        Some((first, rest)) if !first.trim().is_empty() && !first.contains(' ') => rest.trim(),
        _ => inner.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("MATCH (n) RETURN n"), "MATCH (n) RETURN n");
        assert_eq!(
            strip_code_fence("```cypher\nMERGE (n:Topic)\n```"),
            "MERGE (n:Topic)"
        );
        assert_eq!(strip_code_fence("```\nMERGE (n)\n```"), "MERGE (n)");
        assert_eq!(strip_code_fence("  CREATE (n)  "), "CREATE (n)");
    }

    #[test]
    fn test_prompt_template_has_placeholders() {
        for marker in [
            "{structure}",
            "{question}",
            "{answer_lines}",
            "{session_id}",
            "{account_id}",
        ] {
            assert!(MINDMAP_PROMPT.contains(marker), "missing {marker}");
        }
    }
}
