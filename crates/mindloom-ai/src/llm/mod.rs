//! LLM module - Multi-provider LLM client abstraction

mod anthropic;
mod client;
mod google;
mod openai;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use anthropic::AnthropicClient;
pub use client::{
    CompletionRequest, CompletionResponse, FinishReason, LlmClient, Message, Role, StreamChunk,
    StreamResult, TokenUsage,
};
pub use google::GoogleClient;
pub use openai::OpenAIClient;

#[cfg(any(test, feature = "test-utils"))]
pub use mock::{MockLlmClient, MockStep, MockStepKind};
