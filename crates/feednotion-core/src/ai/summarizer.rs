use std::sync::Arc;

use reqwest::Client;

use super::providers::{AiProvider, GeminiApiProvider};
use crate::config::AppConfig;
use crate::{Error, Result};

/// AI Summarizer that wraps the configured provider
///
/// Every call goes straight to the provider, nothing is cached.
pub struct Summarizer {
    provider: Arc<dyn AiProvider>,
}

impl Summarizer {
    /// Create a Gemini-backed summarizer from configuration
    pub fn new(config: &AppConfig, client: Client) -> Result<Self> {
        if config.ai.gemini_api_key.trim().is_empty() {
            return Err(Error::Config("Gemini API key not configured".to_string()));
        }

        let provider = GeminiApiProvider::new(
            client,
            &config.ai.gemini_api_key,
            &config.ai.gemini_model,
            config.ai.max_output_tokens.max(1),
        );

        Ok(Self::with_provider(Arc::new(provider)))
    }

    pub fn with_provider(provider: Arc<dyn AiProvider>) -> Self {
        Self { provider }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Generate a summary for article text
    pub async fn summarize(&self, content: &str) -> Result<String> {
        if content.trim().is_empty() {
            return Err(Error::Summarization("No text content provided".to_string()));
        }

        self.provider.summarize(content).await
    }
}
