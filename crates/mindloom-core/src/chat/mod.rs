//! Chat services: fan-out across providers, the session responder, and
//! small one-shot helpers.

mod fanout;
mod responder;

pub use fanout::fan_out;
pub use responder::{ChatOutcome, ChatRequest, respond};

use anyhow::{Result, anyhow};
use mindloom_ai::llm::{CompletionRequest, Message};
use std::sync::Arc;

use crate::AppCore;

/// System prompt for fan-out comparisons: short answers, no meta talk.
pub(crate) const FANOUT_SYSTEM_PROMPT: &str =
    "You are a chat assistant. Never mention the system, and keep replies short \
     (at most about 450 characters including spaces).";

/// System prompt for session answers that feed the mindmap.
pub(crate) const ANSWER_SYSTEM_PROMPT: &str =
    "Answer the question in at most 13 lines, one statement per line. For simple \
     requests about 5 lines is enough.";

const TITLE_SYSTEM_PROMPT: &str =
    "Create a short keyword or one-sentence title from the input. Reply with the title only.";

/// Generate a room title from a session's opening message.
pub async fn generate_room_title(core: &Arc<AppCore>, user_input: &str) -> Result<String> {
    let generator = core
        .providers
        .text_generator()
        .ok_or_else(|| anyhow!("No text-generation provider configured"))?;

    let request = CompletionRequest::new(vec![
        Message::system(TITLE_SYSTEM_PROMPT),
        Message::user(user_input),
    ])
    .with_max_tokens(64);

    let response = generator
        .client
        .complete(request)
        .await
        .map_err(|e| anyhow!("Title generation failed: {e}"))?;

    Ok(response.content.trim().to_string())
}
