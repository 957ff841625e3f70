//! Chat exchange models.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One sentence of an assistant answer, addressable from graph nodes.
///
/// `sentence_id` is process-wide unique and never reused across sessions;
/// a graph node created for this sentence embeds it as a property so
/// re-execution can find the node instead of duplicating it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerSentence {
    pub sentence_id: String,
    pub content: String,
}

impl AnswerSentence {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            sentence_id: Uuid::new_v4().to_string(),
            content: content.into(),
        }
    }
}

/// Durable record of one question/answer exchange.
///
/// Keeps the original (unescaped) sentences so sentence ids embedded in the
/// graph can be dereferenced back to their text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatExchange {
    pub exchange_id: String,
    pub account_id: String,
    pub session_id: String,
    pub question: String,
    pub answer_sentences: Vec<AnswerSentence>,
    pub created_at: String,
}

/// One provider's result from a fan-out run.
///
/// A failed provider yields an entry with `error` set instead of `text`;
/// it never removes the entry or aborts siblings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderReply {
    pub detail_model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProviderReply {
    pub fn success(detail_model: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            detail_model: detail_model.into(),
            text: Some(text.into()),
            error: None,
        }
    }

    pub fn failure(detail_model: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            detail_model: detail_model.into(),
            text: None,
            error: Some(error.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}
