//! Provider registry - label-keyed access to configured LLM clients.
//!
//! Callers depend on the `LlmClient` capability and on the stable label used
//! to tag relayed fragments; concrete provider identity stays in here.

use std::sync::Arc;

use mindloom_ai::llm::{AnthropicClient, GoogleClient, LlmClient, OpenAIClient};

use crate::config::Config;

/// One registered provider with its stable label and detail-model name.
#[derive(Clone)]
pub struct ProviderEntry {
    pub label: String,
    pub detail_model: String,
    pub client: Arc<dyn LlmClient>,
}

/// Registry of every provider available for fan-out and chat.
#[derive(Default)]
pub struct ProviderRegistry {
    entries: Vec<ProviderEntry>,
}

impl ProviderRegistry {
    /// Build the registry from whichever API keys are configured.
    pub fn from_config(config: &Config) -> Self {
        let mut registry = Self::default();

        if let Some(key) = &config.anthropic_api_key {
            let client = AnthropicClient::new(key.clone());
            registry.register("claude", client.model().to_string(), Arc::new(client));
        }
        if let Some(key) = &config.openai_api_key {
            let client = OpenAIClient::new(key.clone());
            registry.register("chatgpt", client.model().to_string(), Arc::new(client));
        }
        if let Some(key) = &config.google_api_key {
            let client = GoogleClient::new(key.clone());
            registry.register("google", client.model().to_string(), Arc::new(client));
        }

        registry
    }

    pub fn register(
        &mut self,
        label: impl Into<String>,
        detail_model: impl Into<String>,
        client: Arc<dyn LlmClient>,
    ) {
        self.entries.push(ProviderEntry {
            label: label.into(),
            detail_model: detail_model.into(),
            client,
        });
    }

    pub fn entries(&self) -> &[ProviderEntry] {
        &self.entries
    }

    pub fn get(&self, label: &str) -> Option<&ProviderEntry> {
        self.entries.iter().find(|entry| entry.label == label)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Provider used for internal text generation (summaries, graph
    /// mutations, titles). Prefers claude, falls back to the first entry.
    pub fn text_generator(&self) -> Option<&ProviderEntry> {
        self.get("claude").or_else(|| self.entries.first())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_from_config_respects_keys() {
        let config = Config {
            anthropic_api_key: Some("k1".to_string()),
            openai_api_key: None,
            google_api_key: Some("k3".to_string()),
            ..Config::default()
        };

        let registry = ProviderRegistry::from_config(&config);
        assert!(registry.get("claude").is_some());
        assert!(registry.get("chatgpt").is_none());
        assert!(registry.get("google").is_some());
        assert_eq!(registry.text_generator().unwrap().label, "claude");
    }
}
