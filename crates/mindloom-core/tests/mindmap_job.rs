//! Mindmap update job: prompt assembly and the at-most-once overlay.

mod support;

use mindloom_ai::llm::{MockLlmClient, MockStep};
use mindloom_core::jobs::mindmap;
use mindloom_core::models::AnswerSentence;
use mindloom_core::providers::ProviderRegistry;
use std::sync::Arc;
use support::build_core;

fn generator_registry(statement: &str) -> (ProviderRegistry, MockLlmClient) {
    let client = MockLlmClient::from_steps(
        "claude",
        "claude-model",
        vec![MockStep::text(statement)],
    );
    let mut registry = ProviderRegistry::default();
    registry.register("claude", "claude-model", Arc::new(client.clone()));
    (registry, client)
}

fn sentences() -> Vec<AnswerSentence> {
    vec![
        AnswerSentence::new("Rust prevents data races."),
        AnswerSentence::new("The borrow checker enforces this."),
    ]
}

#[tokio::test]
async fn test_job_generates_and_executes_mutation() {
    let (registry, client) = generator_registry("MERGE (n:Topic {sentence_ref: 'x'})");
    let fixture = build_core(registry);
    let sentences = sentences();

    let outcome = mindmap::run(
        &fixture.core,
        "acct-1",
        "room-1",
        "ex-1",
        "why is rust safe?",
        &sentences,
    )
    .await
    .unwrap();
    assert_eq!(outcome, "applied 2 sentences");

    let executed = fixture.graph.executed_statements();
    assert_eq!(executed, vec!["MERGE (n:Topic {sentence_ref: 'x'})"]);

    // The generation prompt carried the sentence ids and the question
    let prompt = &client.requests().await[0].messages[0].content;
    for sentence in &sentences {
        assert!(prompt.contains(&sentence.sentence_id));
    }
    assert!(prompt.contains("why is rust safe?"));
    assert!(prompt.contains("No nodes exist yet."));
}

#[tokio::test]
async fn test_reexecution_with_same_exchange_is_skipped() {
    let (registry, _client) = generator_registry("MERGE (n:Topic {sentence_ref: 'x'})");
    let fixture = build_core(registry);
    let sentences = sentences();

    let first = mindmap::run(&fixture.core, "acct-1", "room-1", "ex-1", "q", &sentences)
        .await
        .unwrap();
    assert_eq!(first, "applied 2 sentences");

    // Queue redelivery: same exchange id, same snapshot
    let second = mindmap::run(&fixture.core, "acct-1", "room-1", "ex-1", "q", &sentences)
        .await
        .unwrap();
    assert_eq!(second, "already applied");

    // No duplicate mutation reached the graph
    assert_eq!(fixture.graph.executed_statements().len(), 1);
}

#[tokio::test]
async fn test_failed_execution_is_not_marked_processed() {
    let (registry, _client) = generator_registry("MERGE (n:Topic {sentence_ref: 'x'})");
    let fixture = build_core(registry);
    let sentences = sentences();

    fixture.graph.set_fail_execute(true);
    let result = mindmap::run(&fixture.core, "acct-1", "room-1", "ex-1", "q", &sentences).await;
    assert!(result.is_err());
    assert!(!fixture.core.exchanges.is_processed("ex-1").unwrap());

    // Redelivery after the collaborator recovers applies the exchange
    fixture.graph.set_fail_execute(false);
    let outcome = mindmap::run(&fixture.core, "acct-1", "room-1", "ex-1", "q", &sentences)
        .await
        .unwrap();
    assert_eq!(outcome, "applied 2 sentences");
    assert!(fixture.core.exchanges.is_processed("ex-1").unwrap());
}

#[tokio::test]
async fn test_fenced_statement_is_unwrapped() {
    let (registry, _client) =
        generator_registry("```cypher\nMERGE (n:Topic {sentence_ref: 'y'})\n```");
    let fixture = build_core(registry);

    mindmap::run(&fixture.core, "acct-1", "room-1", "ex-1", "q", &sentences())
        .await
        .unwrap();

    assert_eq!(
        fixture.graph.executed_statements(),
        vec!["MERGE (n:Topic {sentence_ref: 'y'})"]
    );
}

#[tokio::test]
async fn test_structure_snapshot_is_embedded_in_prompt() {
    let (registry, client) = generator_registry("MERGE (n:Topic {sentence_ref: 'z'})");
    let fixture = build_core(registry);

    *fixture.graph.structure.lock().unwrap() = serde_json::json!([
        {"source": {"title": "Ownership"}, "relationship": "HAS_SUBTOPIC", "target": {"title": "Borrowing"}}
    ]);

    mindmap::run(&fixture.core, "acct-1", "room-1", "ex-1", "q", &sentences())
        .await
        .unwrap();

    let prompt = &client.requests().await[0].messages[0].content;
    assert!(prompt.contains("Ownership"));
    assert!(prompt.contains("HAS_SUBTOPIC"));
    assert!(!prompt.contains("No nodes exist yet."));
}
