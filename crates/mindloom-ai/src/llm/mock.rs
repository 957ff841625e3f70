//! Deterministic mock LLM client for tests.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::{Duration, sleep};

use crate::error::{AiError, Result};

use super::{
    CompletionRequest, CompletionResponse, FinishReason, LlmClient, StreamChunk, StreamResult,
    TokenUsage,
};

/// Deterministic step for scripted mock completions.
#[derive(Debug, Clone)]
pub enum MockStepKind {
    /// Return a plain assistant message.
    Text(String),
    /// Return an LLM error.
    Error(String),
}

/// Scripted completion step with optional delay.
#[derive(Debug, Clone)]
pub struct MockStep {
    pub delay_ms: u64,
    pub kind: MockStepKind,
}

impl MockStep {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            delay_ms: 0,
            kind: MockStepKind::Text(content.into()),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            delay_ms: 0,
            kind: MockStepKind::Error(message.into()),
        }
    }

    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }
}

/// A deterministic mock LLM client driven by scripted steps.
///
/// Streaming responses are chunked on whitespace so callers exercise the
/// same multi-fragment path as a real SSE stream. When the script runs dry
/// the last text step repeats, which keeps multi-call flows simple to set up.
#[derive(Debug, Clone)]
pub struct MockLlmClient {
    provider: String,
    model: String,
    streaming: bool,
    script: Arc<Mutex<VecDeque<MockStep>>>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
    fallback: Arc<Mutex<Option<String>>>,
}

impl MockLlmClient {
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            streaming: true,
            script: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            fallback: Arc::new(Mutex::new(None)),
        }
    }

    pub fn from_steps(
        provider: impl Into<String>,
        model: impl Into<String>,
        steps: Vec<MockStep>,
    ) -> Self {
        let client = Self::new(provider, model);
        {
            let script = client.script.clone();
            let mut queue = script.try_lock().expect("fresh mock script lock");
            queue.extend(steps);
        }
        client
    }

    /// Make the mock report itself as batch-only.
    pub fn batch_only(mut self) -> Self {
        self.streaming = false;
        self
    }

    pub async fn push_step(&self, step: MockStep) {
        self.script.lock().await.push_back(step);
    }

    /// Requests seen so far, in call order.
    pub async fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().await.clone()
    }

    async fn next_step(&self) -> MockStep {
        let mut script = self.script.lock().await;
        match script.pop_front() {
            Some(step) => {
                if let MockStepKind::Text(text) = &step.kind {
                    *self.fallback.lock().await = Some(text.clone());
                }
                step
            }
            None => {
                let fallback = self.fallback.lock().await.clone();
                MockStep::text(fallback.unwrap_or_else(|| "mock response".to_string()))
            }
        }
    }

    fn usage_for(content_len: usize) -> TokenUsage {
        let completion_tokens = content_len as u32;
        TokenUsage {
            prompt_tokens: 1,
            completion_tokens,
            total_tokens: 1 + completion_tokens,
        }
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    fn provider(&self) -> &str {
        &self.provider
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn supports_streaming(&self) -> bool {
        self.streaming
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        self.requests.lock().await.push(request);

        let step = self.next_step().await;
        if step.delay_ms > 0 {
            sleep(Duration::from_millis(step.delay_ms)).await;
        }

        match step.kind {
            MockStepKind::Text(content) => Ok(CompletionResponse {
                usage: Some(Self::usage_for(content.len())),
                content,
                finish_reason: FinishReason::Stop,
            }),
            MockStepKind::Error(message) => Err(AiError::Llm(message)),
        }
    }

    fn complete_stream(&self, request: CompletionRequest) -> StreamResult {
        let this = self.clone();
        Box::pin(async_stream::stream! {
            this.requests.lock().await.push(request);

            let step = this.next_step().await;
            if step.delay_ms > 0 {
                sleep(Duration::from_millis(step.delay_ms)).await;
            }

            match step.kind {
                MockStepKind::Text(content) => {
                    for word in content.split_whitespace() {
                        yield Ok(StreamChunk::text(format!("{word} ")));
                    }
                    yield Ok(StreamChunk::final_chunk(
                        FinishReason::Stop,
                        Some(Self::usage_for(content.len())),
                    ));
                }
                MockStepKind::Error(message) => {
                    yield Err(AiError::Llm(message));
                }
            }
        })
    }
}
