//! Core data models shared across services, jobs and the HTTP surface.

pub mod chat;
pub mod job;

pub use chat::{AnswerSentence, ChatExchange, ProviderReply};
pub use job::{Job, JobPayload, JobStatus};

// Storage-level memory types are part of the public model surface too.
pub use mindloom_storage::{MessageRole, SessionMemory, StoredMessage};
