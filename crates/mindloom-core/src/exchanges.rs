//! Typed exchange log wrapper.
//!
//! Wraps the byte-level exchange storage with the `ChatExchange` model and
//! exposes the processed-marker check the mindmap job uses for its
//! at-most-once overlay.

use anyhow::Result;
use chrono::Utc;
use mindloom_storage::ExchangeLogStorage;

use crate::models::ChatExchange;

#[derive(Clone)]
pub struct ExchangeLog {
    inner: ExchangeLogStorage,
}

impl ExchangeLog {
    pub fn new(inner: ExchangeLogStorage) -> Self {
        Self { inner }
    }

    /// Persist one question/answer exchange record.
    pub fn record(&self, exchange: &ChatExchange) -> Result<()> {
        let bytes = serde_json::to_vec(exchange)?;
        self.inner.put_raw(&exchange.exchange_id, &bytes)
    }

    /// Get an exchange record by id.
    pub fn get(&self, exchange_id: &str) -> Result<Option<ChatExchange>> {
        match self.inner.get_raw(exchange_id)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// List exchange records for one session, oldest first.
    pub fn list_for_session(&self, session_id: &str) -> Result<Vec<ChatExchange>> {
        let mut exchanges: Vec<ChatExchange> = self
            .inner
            .list_raw()?
            .iter()
            .filter_map(|bytes| serde_json::from_slice::<ChatExchange>(bytes).ok())
            .filter(|exchange| exchange.session_id == session_id)
            .collect();

        exchanges.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(exchanges)
    }

    /// Mark an exchange as applied to the graph.
    pub fn mark_processed(&self, exchange_id: &str) -> Result<()> {
        self.inner
            .mark_processed(exchange_id, &Utc::now().to_rfc3339())
    }

    /// Whether an exchange was already applied to the graph.
    pub fn is_processed(&self, exchange_id: &str) -> Result<bool> {
        self.inner.is_processed(exchange_id)
    }
}
