//! Mindloom AI - multi-provider LLM client abstraction.
//!
//! Providers expose one capability: batch completion plus (where the API
//! supports it) incremental streaming. Callers branch on
//! `supports_streaming()` and never on concrete provider identity.

pub mod error;
mod http_client;
pub mod llm;
pub mod text;

pub use error::{AiError, Result};
